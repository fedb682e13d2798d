use std::collections::HashMap;

use launch_data::{Dataset, PayloadKg};
use serde::{Deserialize, Serialize};

/// Wire value of the "no site restriction" dropdown option.
pub const ALL_SITES: &str = "ALL";

const X_AXIS_LABEL: &str = "Payload Mass (kg)";
const Y_AXIS_LABEL: &str = "Launch Outcome (1=Success, 0=Failure)";
const SUCCESS_LABEL: &str = "Success";
const FAILURE_LABEL: &str = "Failure";

/// Site filter: every site, or one specific launch site.
///
/// On the wire this is the raw dropdown value, with `"ALL"` as the
/// sentinel for no restriction.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SiteFilter {
    #[default]
    All,
    Site(String),
}

impl SiteFilter {
    pub fn from_value(value: &str) -> Self {
        if value == ALL_SITES {
            SiteFilter::All
        } else {
            SiteFilter::Site(value.to_string())
        }
    }

    pub fn value(&self) -> &str {
        match self {
            SiteFilter::All => ALL_SITES,
            SiteFilter::Site(site) => site,
        }
    }

    pub fn matches(&self, site: &str) -> bool {
        match self {
            SiteFilter::All => true,
            SiteFilter::Site(selected) => selected == site,
        }
    }
}

impl From<String> for SiteFilter {
    fn from(value: String) -> Self {
        Self::from_value(&value)
    }
}

impl From<SiteFilter> for String {
    fn from(filter: SiteFilter) -> Self {
        filter.value().to_string()
    }
}

/// Inclusive payload-mass window selected by the range slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PayloadRange {
    pub low: PayloadKg,
    pub high: PayloadKg,
}

impl PayloadRange {
    pub fn new(low: PayloadKg, high: PayloadKg) -> Self {
        Self { low, high }
    }

    /// Normalize a possibly malformed range from the control layer:
    /// swap inverted ends, then clamp both into `[min, max]`.
    pub fn normalized(self, min: PayloadKg, max: PayloadKg) -> Self {
        let (low, high) = if self.low <= self.high {
            (self.low, self.high)
        } else {
            (self.high, self.low)
        };
        Self {
            low: low.clamp(min, max),
            high: high.clamp(min, max),
        }
    }

    pub fn contains(&self, mass: PayloadKg) -> bool {
        self.low <= mass && mass <= self.high
    }
}

/// One slice of a proportion chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieSlice {
    pub label: String,
    pub count: u64,
}

/// One point of a point-cloud chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterPoint {
    pub x: PayloadKg,
    pub y: u8,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<PieSlice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub points: Vec<ScatterPoint>,
}

/// Renderer-agnostic chart description shipped to the front end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSpec {
    Pie(PieChart),
    Scatter(ScatterChart),
}

impl ChartSpec {
    /// True when no slice or point survived the filters.
    pub fn is_empty(&self) -> bool {
        match self {
            ChartSpec::Pie(pie) => pie.slices.is_empty(),
            ChartSpec::Scatter(scatter) => scatter.points.is_empty(),
        }
    }
}

/// Success counts for the proportion chart.
///
/// With no site filter the chart has one slice per site counting its
/// successful launches; with a site selected it has up to two slices
/// counting that site's successes and failures. A site with only one
/// outcome yields a single-slice chart; a site with no rows yields an
/// empty chart.
pub fn success_summary(dataset: &Dataset, site: &SiteFilter) -> ChartSpec {
    match site {
        SiteFilter::All => {
            let mut counts: HashMap<&str, u64> = HashMap::new();
            for rec in dataset.records().iter().filter(|r| r.is_success()) {
                *counts.entry(rec.site.as_str()).or_insert(0) += 1;
            }
            // Emit in the dataset's sorted site order so output is stable.
            let slices = dataset
                .sites()
                .iter()
                .filter_map(|name| {
                    counts.get(name.as_str()).map(|&count| PieSlice {
                        label: name.clone(),
                        count,
                    })
                })
                .collect();
            ChartSpec::Pie(PieChart {
                title: "Total Successful Launches by Site".to_string(),
                slices,
            })
        }
        SiteFilter::Site(name) => {
            let mut successes = 0u64;
            let mut failures = 0u64;
            for rec in dataset.records().iter().filter(|r| r.site == *name) {
                if rec.is_success() {
                    successes += 1;
                } else {
                    failures += 1;
                }
            }
            let mut slices = Vec::new();
            if successes > 0 {
                slices.push(PieSlice {
                    label: SUCCESS_LABEL.to_string(),
                    count: successes,
                });
            }
            if failures > 0 {
                slices.push(PieSlice {
                    label: FAILURE_LABEL.to_string(),
                    count: failures,
                });
            }
            ChartSpec::Pie(PieChart {
                title: format!("Total Success Launches for Site {name}"),
                slices,
            })
        }
    }
}

/// Payload mass vs. outcome point cloud, grouped by booster category.
///
/// The range is normalized first so a malformed slider value degrades to
/// a valid window instead of an error. Points keep dataset order.
pub fn payload_correlation(
    dataset: &Dataset,
    site: &SiteFilter,
    range: PayloadRange,
) -> ChartSpec {
    let range = range.normalized(dataset.min_payload(), dataset.max_payload());
    let points = dataset
        .records()
        .iter()
        .filter(|r| range.contains(r.payload_mass) && site.matches(&r.site))
        .map(|r| ScatterPoint {
            x: r.payload_mass,
            y: r.outcome,
            group: r.booster_category.clone(),
        })
        .collect();
    let title = match site {
        SiteFilter::All => "Payload vs. Outcome for All Sites".to_string(),
        SiteFilter::Site(name) => format!("Payload vs. Outcome for Site {name}"),
    };
    ChartSpec::Scatter(ScatterChart {
        title,
        x_axis: X_AXIS_LABEL.to_string(),
        y_axis: Y_AXIS_LABEL.to_string(),
        points,
    })
}
