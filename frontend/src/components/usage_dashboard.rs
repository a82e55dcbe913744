use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use shared::{BucketWidth, UsageQuery};
use yew::prelude::*;

use crate::analytics::aggregator::AggregateOptions;
use crate::api::usage::{fetch_usage_report, UsageReport};
use crate::api::{CancellationToken, LoadOptions};
use crate::components::usage_chart::UsageChart;
use crate::config::{ChartDefaults, Config};
use crate::hooks::use_async_data;

#[derive(Properties, PartialEq)]
pub struct UsageDashboardProps {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    #[prop_or(ChartDefaults::default().bucket_width)]
    pub interval: BucketWidth,
    #[prop_or_default]
    pub operator_id: Option<String>,
    /// Timezone used for axis labels and exported timestamps
    #[prop_or(chrono_tz::UTC)]
    pub timezone: Tz,
}

/// The slice of props that identifies which events are being paged through
#[derive(Debug, Clone, PartialEq)]
struct UsageWindow {
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    interval: BucketWidth,
    operator_id: Option<String>,
}

impl From<&UsageDashboardProps> for UsageWindow {
    fn from(props: &UsageDashboardProps) -> Self {
        Self {
            from: props.from,
            to: props.to,
            interval: props.interval,
            operator_id: props.operator_id.clone(),
        }
    }
}

/// Page chosen by the user, remembered together with the window it was
/// chosen in
#[derive(Debug, Clone, PartialEq)]
struct PageSelection {
    window: UsageWindow,
    page: u32,
}

impl PageSelection {
    /// A different window always starts on the first page
    fn page_in(&self, window: &UsageWindow) -> u32 {
        if &self.window == window {
            self.page
        } else {
            0
        }
    }
}

#[function_component(UsageDashboard)]
pub fn usage_dashboard(props: &UsageDashboardProps) -> Html {
    let window = UsageWindow::from(props);
    let selection = use_state(|| PageSelection {
        window: UsageWindow::from(props),
        page: 0,
    });
    let page = selection.page_in(&window);

    let mut query = UsageQuery::new(props.from, props.to, props.interval).with_page(page);
    query.size = Config::DEFAULT_PAGE_SIZE;
    query.operator_id = props.operator_id.clone();

    let report = use_async_data(
        |query: UsageQuery, token: CancellationToken| {
            fetch_usage_report(query, AggregateOptions::default(), token)
        },
        query,
        LoadOptions {
            enabled: true,
            preserve_previous_data: true,
        },
    );

    let body = match (&report.state.data, &report.state.error) {
        (_, Some(error)) => {
            let on_retry = {
                let reload = report.reload.clone();
                Callback::from(move |_: MouseEvent| reload.emit(()))
            };
            html! {
                <div class="bg-red-50 border border-red-200 rounded-lg p-4 text-red-700">
                    <p class="font-medium">{"Failed to load usage data"}</p>
                    <p class="text-sm mt-1">{error.to_string()}</p>
                    <button class="mt-3 px-3 py-1 text-sm rounded bg-red-600 text-white" onclick={on_retry}>
                        {"Retry"}
                    </button>
                </div>
            }
        }
        (Some(UsageReport { series: Some(usage), .. }), None) => {
            let mut usage = usage.clone();
            usage.timezone = props.timezone;
            html! { <UsageChart {usage} /> }
        }
        (Some(UsageReport { series: None, .. }), None) => html! {
            <div class="text-center text-gray-500 py-12">{"No usage recorded in this window"}</div>
        },
        (None, None) => html! {
            <div class="flex justify-center py-12">
                <div class="animate-spin rounded-full h-8 w-8 border-b-2 border-blue-600"></div>
            </div>
        },
    };

    let pager = report.state.data.as_ref().map(|report| report.pagination).filter(|meta| meta.total_pages > 1);
    let pager = match pager {
        Some(meta) => {
            let go_to = |target: Option<u32>| {
                let selection = selection.clone();
                let window = window.clone();
                Callback::from(move |_: MouseEvent| {
                    if let Some(page) = target {
                        selection.set(PageSelection {
                            window: window.clone(),
                            page,
                        });
                    }
                })
            };
            html! {
                <div class="flex items-center justify-end gap-3 mt-3 text-sm">
                    <button class="px-2 py-1 rounded border" disabled={!meta.has_previous()} onclick={go_to(meta.previous_page())}>
                        {"Previous"}
                    </button>
                    <span>{format!("Page {} of {}", meta.page + 1, meta.total_pages)}</span>
                    <button class="px-2 py-1 rounded border" disabled={!meta.has_next()} onclick={go_to(meta.next_page())}>
                        {"Next"}
                    </button>
                </div>
            }
        }
        None => html! {},
    };

    html! {
        <section class="space-y-2">
            <div class="flex items-center justify-between">
                <h2 class="text-lg font-semibold text-gray-800">{"Usage"}</h2>
                if report.state.loading {
                    <span class="text-xs text-gray-500">{"Refreshing…"}</span>
                }
            </div>
            {body}
            {pager}
        </section>
    }
}
