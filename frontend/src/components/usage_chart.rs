use shared::UsageTimeSeries;
use wasm_bindgen::JsCast;
use web_sys::{Element, MouseEvent};
use yew::prelude::*;

use crate::analytics::scale::ScaleMode;
use crate::charts::animation::RafScheduler;
use crate::charts::svg::render_svg;
use crate::charts::{
    usage_identity, AnimationLoop, ChartRenderer, SeriesVisibility, TimeSeriesChart, TimeSeriesConfig,
};
use crate::config::ChartDefaults;
use crate::export::{csv_artifact, download, svg_artifact, ExportError};

#[derive(Properties, PartialEq)]
pub struct UsageChartProps {
    pub usage: UsageTimeSeries,
    #[prop_or_default]
    pub defaults: ChartDefaults,
}

fn build_chart(
    usage: &UsageTimeSeries,
    defaults: &ChartDefaults,
    visibility: &SeriesVisibility,
    stacked: bool,
    mode: ScaleMode,
) -> TimeSeriesChart {
    TimeSeriesChart::new(
        defaults.geometry,
        usage.clone(),
        visibility.clone(),
        TimeSeriesConfig {
            stacked,
            mode,
            tick_count: defaults.tick_count,
            ..TimeSeriesConfig::default()
        },
    )
}

/// Pointer position relative to the element the handler is attached to
fn local_pointer(event: &MouseEvent) -> Option<(f64, f64)> {
    let target = event.current_target()?.dyn_into::<Element>().ok()?;
    let rect = target.get_bounding_client_rect();
    Some((
        event.client_x() as f64 - rect.left(),
        event.client_y() as f64 - rect.top(),
    ))
}

#[function_component(UsageChart)]
pub fn usage_chart(props: &UsageChartProps) -> Html {
    let visibility = use_state(SeriesVisibility::new);
    let stacked = use_state(|| props.defaults.stacked);
    let mode = use_state(|| props.defaults.scale_mode);
    let pointer = use_state(|| None::<(f64, f64)>);
    let progress = use_state(|| 0.0_f64);
    let export_error = use_state(|| None::<String>);

    // restart the entrance animation only when the data itself changes
    {
        let progress = progress.clone();
        let animation = props.defaults.animation;
        use_effect_with(usage_identity(&props.usage), move |identity| {
            let animation_loop = AnimationLoop::new(RafScheduler, animation);
            animation_loop.start(*identity, move |p| progress.set(p));
            move || animation_loop.cancel()
        });
    }

    let mut chart = build_chart(&props.usage, &props.defaults, &visibility, *stacked, *mode);
    if let Some((x, y)) = *pointer {
        chart.pointer_move(x, y);
    }
    let svg = render_svg(&chart.frame(*progress), None);

    let onmousemove = {
        let pointer = pointer.clone();
        Callback::from(move |e: MouseEvent| pointer.set(local_pointer(&e)))
    };
    let onmouseleave = {
        let pointer = pointer.clone();
        Callback::from(move |_: MouseEvent| pointer.set(None))
    };

    let report_export = {
        let export_error = export_error.clone();
        move |result: Result<(), ExportError>| match result {
            Ok(()) => export_error.set(None),
            Err(e) => {
                log::warn!("Export failed: {}", e);
                export_error.set(Some(e.to_string()));
            }
        }
    };

    let on_export_csv = {
        let usage = props.usage.clone();
        let report_export = report_export.clone();
        Callback::from(move |_: MouseEvent| {
            report_export(csv_artifact(&usage).and_then(|artifact| download(&artifact)));
        })
    };

    let on_export_svg = {
        let usage = props.usage.clone();
        let defaults = props.defaults.clone();
        let visibility = (*visibility).clone();
        let (stacked, mode) = (*stacked, *mode);
        Callback::from(move |_: MouseEvent| {
            let frame = build_chart(&usage, &defaults, &visibility, stacked, mode).frame(1.0);
            report_export(download(&svg_artifact(&usage, &frame)));
        })
    };

    let on_toggle_stacked = {
        let stacked = stacked.clone();
        Callback::from(move |_: MouseEvent| stacked.set(!*stacked))
    };
    let on_toggle_mode = {
        let mode = mode.clone();
        Callback::from(move |_: MouseEvent| {
            mode.set(match *mode {
                ScaleMode::Linear => ScaleMode::Log,
                ScaleMode::Log => ScaleMode::Linear,
            })
        })
    };

    let legend = chart
        .legend()
        .into_iter()
        .map(|entry| {
            let onclick = {
                let visibility = visibility.clone();
                let key = entry.key.clone();
                Callback::from(move |_: MouseEvent| visibility.set(visibility.toggled(&key)))
            };
            let item_class = if entry.visible {
                "flex items-center gap-2 text-sm text-gray-700"
            } else {
                "flex items-center gap-2 text-sm text-gray-400 line-through"
            };
            html! {
                <button key={entry.key.clone()} class={item_class} {onclick}>
                    <span class="inline-block w-3 h-3 rounded-sm" style={format!("background-color: {}", entry.color)}></span>
                    {entry.label}
                </button>
            }
        })
        .collect::<Html>();

    html! {
        <div class="bg-white rounded-lg shadow p-4">
            <div class="flex flex-wrap items-center justify-between gap-2 mb-3">
                <div class="flex flex-wrap gap-3">{legend}</div>
                <div class="flex gap-2">
                    <button class="px-3 py-1 text-sm rounded border" onclick={on_toggle_stacked}>
                        {if *stacked { "Unstack" } else { "Stack" }}
                    </button>
                    <button class="px-3 py-1 text-sm rounded border" onclick={on_toggle_mode}>
                        {if *mode == ScaleMode::Log { "Linear" } else { "Log" }}
                    </button>
                    <button class="px-3 py-1 text-sm rounded border" onclick={on_export_csv}>{"CSV"}</button>
                    <button class="px-3 py-1 text-sm rounded border" onclick={on_export_svg}>{"SVG"}</button>
                </div>
            </div>
            <div class="usage-chart" {onmousemove} {onmouseleave}>
                {Html::from_html_unchecked(AttrValue::from(svg))}
            </div>
            if let Some(error) = (*export_error).clone() {
                <p class="mt-2 text-sm text-red-600">{error}</p>
            }
        </div>
    }
}
