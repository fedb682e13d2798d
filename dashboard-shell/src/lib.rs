use std::sync::Arc;

use chart_views::{
    payload_correlation, success_summary, ChartSpec, PayloadRange, SiteFilter, ALL_SITES,
};
use launch_data::Dataset;
use serde::{Deserialize, Serialize};

/// Slider granularity in kilograms.
pub const PAYLOAD_STEP_KG: f64 = 1000.0;

/// The two interactive controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlId {
    SiteSelect,
    PayloadSlider,
}

/// Control-state fields a view can read and a control can write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlField {
    Site,
    PayloadRange,
}

impl ControlId {
    /// The state field this control writes.
    pub fn writes(&self) -> ControlField {
        match self {
            ControlId::SiteSelect => ControlField::Site,
            ControlId::PayloadSlider => ControlField::PayloadRange,
        }
    }
}

/// The two charts the dashboard renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewId {
    SuccessSummary,
    PayloadCorrelation,
}

/// Current values of both controls.
///
/// Updated atomically once per event and always passed whole to the view
/// functions; views are functions of total state, not of deltas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlState {
    pub site: SiteFilter,
    pub payload_range: PayloadRange,
}

impl ControlState {
    /// Defaults: no site restriction, full payload range.
    pub fn defaults(dataset: &Dataset) -> Self {
        Self {
            site: SiteFilter::All,
            payload_range: PayloadRange::new(dataset.min_payload(), dataset.max_payload()),
        }
    }
}

/// A control-change event as received from the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "control", rename_all = "snake_case")]
pub enum ControlEvent {
    SiteSelect { value: SiteFilter },
    PayloadSlider { low: f64, high: f64 },
}

impl ControlEvent {
    pub fn id(&self) -> ControlId {
        match self {
            ControlEvent::SiteSelect { .. } => ControlId::SiteSelect,
            ControlEvent::PayloadSlider { .. } => ControlId::PayloadSlider,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteDropdown {
    pub id: ControlId,
    pub options: Vec<DropdownOption>,
    pub default: String,
    pub placeholder: String,
    pub searchable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayloadSlider {
    pub id: ControlId,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub marks: Vec<f64>,
    pub default: PayloadRange,
}

/// Everything the UI collaborator needs to draw the two controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSurface {
    pub site_dropdown: SiteDropdown,
    pub payload_slider: PayloadSlider,
}

impl ControlSurface {
    /// Derive both controls from the dataset. The option list always
    /// reflects the sites actually present, never a maintained literal.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut options = vec![DropdownOption {
            label: "All Sites".to_string(),
            value: ALL_SITES.to_string(),
        }];
        options.extend(dataset.sites().iter().map(|site| DropdownOption {
            label: site.clone(),
            value: site.clone(),
        }));
        let (min, max) = (dataset.min_payload(), dataset.max_payload());
        Self {
            site_dropdown: SiteDropdown {
                id: ControlId::SiteSelect,
                options,
                default: ALL_SITES.to_string(),
                placeholder: "Select a Launch Site here".to_string(),
                searchable: true,
            },
            payload_slider: PayloadSlider {
                id: ControlId::PayloadSlider,
                min,
                max,
                step: PAYLOAD_STEP_KG,
                marks: slider_marks(min, max, PAYLOAD_STEP_KG),
                default: PayloadRange::new(min, max),
            },
        }
    }
}

/// Tick marks at step multiples inside `[min, max]`, ends included.
fn slider_marks(min: f64, max: f64, step: f64) -> Vec<f64> {
    let mut marks = vec![min];
    let mut mark = (min / step).floor() * step + step;
    while mark < max {
        if mark > min {
            marks.push(mark);
        }
        mark += step;
    }
    if max > min {
        marks.push(max);
    }
    marks
}

/// Registration of a view with the exact state fields it reads.
#[derive(Debug, Clone)]
pub struct ViewBinding {
    pub view: ViewId,
    pub reads: &'static [ControlField],
}

/// Maps control changes to the views that must recompute.
///
/// Dependencies are declared at registration time instead of living in
/// per-callback metadata, so a view that stops reading a field stops
/// being rerun for it.
#[derive(Debug, Clone)]
pub struct Binder {
    bindings: Vec<ViewBinding>,
}

impl Binder {
    pub fn empty() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// The two stock views: the summary reads only the site filter, the
    /// correlation reads the site filter and the payload range.
    pub fn with_default_bindings() -> Self {
        let mut binder = Self::empty();
        binder.register(ViewId::SuccessSummary, &[ControlField::Site]);
        binder.register(
            ViewId::PayloadCorrelation,
            &[ControlField::Site, ControlField::PayloadRange],
        );
        binder
    }

    pub fn register(&mut self, view: ViewId, reads: &'static [ControlField]) {
        self.bindings.push(ViewBinding { view, reads });
    }

    /// Every registered view, registration order.
    pub fn views(&self) -> Vec<ViewId> {
        self.bindings.iter().map(|b| b.view).collect()
    }

    /// Views whose read-set contains the written field, registration order.
    pub fn affected_by(&self, field: ControlField) -> Vec<ViewId> {
        self.bindings
            .iter()
            .filter(|b| b.reads.contains(&field))
            .map(|b| b.view)
            .collect()
    }
}

impl Default for Binder {
    fn default() -> Self {
        Self::with_default_bindings()
    }
}

/// Consumer of freshly computed charts; the transport boundary.
pub trait ChartSink {
    fn on_chart(&mut self, view: ViewId, spec: ChartSpec);
}

impl ChartSink for Vec<(ViewId, ChartSpec)> {
    fn on_chart(&mut self, view: ViewId, spec: ChartSpec) {
        self.push((view, spec));
    }
}

/// Immutable per-process context: the loaded table and the control
/// surface derived from it. Constructed once at startup and shared.
#[derive(Debug, Clone)]
pub struct AppContext {
    dataset: Arc<Dataset>,
    surface: ControlSurface,
}

impl AppContext {
    pub fn new(dataset: Arc<Dataset>) -> Self {
        let surface = ControlSurface::from_dataset(&dataset);
        Self { dataset, surface }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn surface(&self) -> &ControlSurface {
        &self.surface
    }
}

/// One interactive session: a control-state cell plus the binder that
/// turns each control event into view recomputations.
#[derive(Debug, Clone)]
pub struct Dashboard {
    ctx: AppContext,
    state: ControlState,
    binder: Binder,
}

impl Dashboard {
    pub fn new(ctx: AppContext) -> Self {
        let state = ControlState::defaults(ctx.dataset());
        Self::with_state(ctx, state)
    }

    /// Start from explicit control values; the range is normalized so
    /// the state invariant holds from the first computation.
    pub fn with_state(ctx: AppContext, mut state: ControlState) -> Self {
        let dataset = ctx.dataset();
        state.payload_range = state
            .payload_range
            .normalized(dataset.min_payload(), dataset.max_payload());
        Self {
            ctx,
            state,
            binder: Binder::with_default_bindings(),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn state(&self) -> &ControlState {
        &self.state
    }

    /// Recompute one view from the full current state.
    pub fn compute(&self, view: ViewId) -> ChartSpec {
        let dataset = self.ctx.dataset();
        match view {
            ViewId::SuccessSummary => success_summary(dataset, &self.state.site),
            ViewId::PayloadCorrelation => {
                payload_correlation(dataset, &self.state.site, self.state.payload_range)
            }
        }
    }

    /// Emit every registered view; used for the initial paint.
    pub fn render_all(&self, sink: &mut dyn ChartSink) {
        for view in self.binder.views() {
            sink.on_chart(view, self.compute(view));
        }
    }

    /// Apply one control event: update the state cell atomically, then
    /// recompute exactly the views that read the written field.
    pub fn apply(&mut self, event: &ControlEvent, sink: &mut dyn ChartSink) {
        let field = event.id().writes();
        match event {
            ControlEvent::SiteSelect { value } => {
                self.state.site = value.clone();
            }
            ControlEvent::PayloadSlider { low, high } => {
                let dataset = self.ctx.dataset();
                self.state.payload_range = PayloadRange::new(*low, *high)
                    .normalized(dataset.min_payload(), dataset.max_payload());
            }
        }
        for view in self.binder.affected_by(field) {
            sink.on_chart(view, self.compute(view));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use launch_data::LaunchRecord;

    fn mk_record(site: &str, mass: f64, booster: &str, outcome: u8) -> LaunchRecord {
        LaunchRecord {
            site: site.to_string(),
            payload_mass: mass,
            booster_category: booster.to_string(),
            outcome,
        }
    }

    fn ctx() -> AppContext {
        let dataset = Dataset::from_records(vec![
            mk_record("KSC LC-39A", 5000.0, "v1.0", 1),
            mk_record("KSC LC-39A", 3000.0, "v1.0", 0),
            mk_record("VAFB SLC-4E", 4000.0, "v1.1", 1),
        ])
        .unwrap();
        AppContext::new(Arc::new(dataset))
    }

    #[test]
    fn surface_derives_options_from_dataset() {
        let ctx = ctx();
        let dropdown = &ctx.surface().site_dropdown;
        let values: Vec<&str> = dropdown.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["ALL", "KSC LC-39A", "VAFB SLC-4E"]);
        assert_eq!(dropdown.options[0].label, "All Sites");
        assert_eq!(dropdown.default, "ALL");

        let slider = &ctx.surface().payload_slider;
        assert_eq!(slider.min, 3000.0);
        assert_eq!(slider.max, 5000.0);
        assert_eq!(slider.step, PAYLOAD_STEP_KG);
        assert_eq!(slider.default, PayloadRange::new(3000.0, 5000.0));
        assert_eq!(slider.marks, [3000.0, 4000.0, 5000.0]);
    }

    #[test]
    fn slider_marks_cover_unaligned_bounds() {
        assert_eq!(
            slider_marks(362.0, 5300.0, 1000.0),
            [362.0, 1000.0, 2000.0, 3000.0, 4000.0, 5000.0, 5300.0]
        );
        assert_eq!(slider_marks(500.0, 500.0, 1000.0), [500.0]);
    }

    #[test]
    fn defaults_are_all_sites_full_range() {
        let ctx = ctx();
        let state = ControlState::defaults(ctx.dataset());
        assert_eq!(state.site, SiteFilter::All);
        assert_eq!(state.payload_range, PayloadRange::new(3000.0, 5000.0));
    }

    #[test]
    fn site_event_recomputes_both_views() {
        let ctx = ctx();
        let mut dashboard = Dashboard::new(ctx);
        let mut out: Vec<(ViewId, ChartSpec)> = Vec::new();
        dashboard.apply(
            &ControlEvent::SiteSelect {
                value: SiteFilter::from_value("KSC LC-39A"),
            },
            &mut out,
        );
        let views: Vec<ViewId> = out.iter().map(|(v, _)| *v).collect();
        assert_eq!(views, [ViewId::SuccessSummary, ViewId::PayloadCorrelation]);
    }

    #[test]
    fn range_event_recomputes_correlation_only() {
        let ctx = ctx();
        let mut dashboard = Dashboard::new(ctx);
        let mut out: Vec<(ViewId, ChartSpec)> = Vec::new();
        dashboard.apply(
            &ControlEvent::PayloadSlider {
                low: 3500.0,
                high: 4500.0,
            },
            &mut out,
        );
        let views: Vec<ViewId> = out.iter().map(|(v, _)| *v).collect();
        assert_eq!(views, [ViewId::PayloadCorrelation]);
    }

    #[test]
    fn views_receive_full_state_not_deltas() {
        let ctx = ctx();
        let mut dashboard = Dashboard::new(ctx);
        let mut out: Vec<(ViewId, ChartSpec)> = Vec::new();
        // Narrow the range first, then change the site: the correlation
        // recomputed for the site event must still honor the range.
        dashboard.apply(
            &ControlEvent::PayloadSlider {
                low: 3500.0,
                high: 4500.0,
            },
            &mut out,
        );
        out.clear();
        dashboard.apply(
            &ControlEvent::SiteSelect {
                value: SiteFilter::All,
            },
            &mut out,
        );
        let correlation = out
            .iter()
            .find(|(v, _)| *v == ViewId::PayloadCorrelation)
            .map(|(_, spec)| spec)
            .unwrap();
        match correlation {
            ChartSpec::Scatter(scatter) => {
                assert_eq!(scatter.points.len(), 1);
                assert_eq!(scatter.points[0].x, 4000.0);
            }
            other => panic!("expected scatter, got {other:?}"),
        }
    }

    #[test]
    fn replaying_an_event_yields_identical_charts() {
        let ctx = ctx();
        let mut dashboard = Dashboard::new(ctx);
        let event = ControlEvent::SiteSelect {
            value: SiteFilter::from_value("VAFB SLC-4E"),
        };
        let mut first: Vec<(ViewId, ChartSpec)> = Vec::new();
        dashboard.apply(&event, &mut first);
        let mut second: Vec<(ViewId, ChartSpec)> = Vec::new();
        dashboard.apply(&event, &mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_slider_event_is_normalized_into_state() {
        let ctx = ctx();
        let mut dashboard = Dashboard::new(ctx);
        let mut out: Vec<(ViewId, ChartSpec)> = Vec::new();
        dashboard.apply(
            &ControlEvent::PayloadSlider {
                low: 99999.0,
                high: -10.0,
            },
            &mut out,
        );
        assert_eq!(
            dashboard.state().payload_range,
            PayloadRange::new(3000.0, 5000.0)
        );
    }

    #[test]
    fn unregistered_binder_field_affects_nothing() {
        let mut binder = Binder::empty();
        binder.register(ViewId::SuccessSummary, &[ControlField::Site]);
        assert!(binder.affected_by(ControlField::PayloadRange).is_empty());
        assert_eq!(
            binder.affected_by(ControlField::Site),
            [ViewId::SuccessSummary]
        );
    }

    #[test]
    fn control_event_wire_format() {
        let event: ControlEvent =
            serde_json::from_str(r#"{"control":"site_select","value":"ALL"}"#).unwrap();
        assert_eq!(
            event,
            ControlEvent::SiteSelect {
                value: SiteFilter::All
            }
        );
        let event: ControlEvent =
            serde_json::from_str(r#"{"control":"payload_slider","low":0,"high":4500}"#).unwrap();
        assert_eq!(event.id(), ControlId::PayloadSlider);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["control"], "payload_slider");
        assert_eq!(json["high"], 4500.0);
    }

    #[test]
    fn initial_render_emits_every_view() {
        let ctx = ctx();
        let dashboard = Dashboard::new(ctx);
        let mut out: Vec<(ViewId, ChartSpec)> = Vec::new();
        dashboard.render_all(&mut out);
        assert_eq!(out.len(), 2);
        assert!(!out[0].1.is_empty());
        assert!(!out[1].1.is_empty());
    }
}
