use serde::{Deserialize, Serialize};

/// One detection as it arrives from the remote service. Geometry fields are
/// optional on the wire; an entry missing any of them is dropped before
/// drawing or counting.
#[derive(Debug, Clone, Deserialize)]
pub struct RawDetection {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub confidence: f64,
}

/// A detection with complete geometry. The box is center-based: (x, y) is
/// the center, width/height the full extent, all in pixel units.
#[derive(Debug, Clone)]
pub struct Detection {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub class: String,
    pub confidence: f64,
}

impl Detection {
    pub fn from_raw(raw: &RawDetection) -> Option<Self> {
        match (raw.x, raw.y, raw.width, raw.height) {
            (Some(x), Some(y), Some(width), Some(height)) => Some(Self {
                x,
                y,
                width,
                height,
                class: raw.class.clone(),
                confidence: raw.confidence,
            }),
            _ => None,
        }
    }

    /// Axis-aligned corners, ((top-left), (bottom-right)).
    pub fn corners(&self) -> ((f64, f64), (f64, f64)) {
        let (half_w, half_h) = (self.width / 2.0, self.height / 2.0);
        (
            (self.x - half_w, self.y - half_h),
            (self.x + half_w, self.y + half_h),
        )
    }

    /// Text burned in next to the box, confidence as a percentage with one
    /// decimal.
    pub fn label(&self) -> String {
        format!("{} {:.1}%", self.class, self.confidence * 100.0)
    }
}

/// Detection variant selected by the client, deciding the remote model and
/// whether the response carries a count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMode {
    #[default]
    Disease,
    Corn,
}

impl DetectionMode {
    /// Anything other than `corn` runs the disease model.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "corn" => Self::Corn,
            _ => Self::Disease,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disease => "disease",
            Self::Corn => "corn",
        }
    }

    pub fn is_corn(&self) -> bool {
        matches!(self, Self::Corn)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AnnotatedPrediction {
    pub class: String,
    pub confidence: f64,
}

impl From<&Detection> for AnnotatedPrediction {
    fn from(det: &Detection) -> Self {
        Self {
            class: det.class.clone(),
            confidence: round2(det.confidence * 100.0),
        }
    }
}

/// Body of a successful `POST /predict`. `count` stays in the payload as
/// JSON null outside corn mode.
#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub mode: DetectionMode,
    pub count: Option<usize>,
    pub predictions: Vec<AnnotatedPrediction>,
    pub image_url: String,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_raw() -> RawDetection {
        RawDetection {
            x: Some(100.0),
            y: Some(100.0),
            width: Some(40.0),
            height: Some(20.0),
            class: "rust".to_string(),
            confidence: 0.87,
        }
    }

    #[test]
    fn corners_are_derived_from_center_and_size() {
        let det = Detection::from_raw(&complete_raw()).unwrap();
        let ((x0, y0), (x1, y1)) = det.corners();

        assert_eq!((x0, y0), (80.0, 90.0));
        assert_eq!((x1, y1), (120.0, 110.0));
    }

    #[test]
    fn detections_missing_geometry_are_rejected() {
        for missing in 0..4 {
            let mut raw = complete_raw();
            match missing {
                0 => raw.x = None,
                1 => raw.y = None,
                2 => raw.width = None,
                _ => raw.height = None,
            }
            assert!(Detection::from_raw(&raw).is_none());
        }
    }

    #[test]
    fn label_shows_percentage_with_one_decimal() {
        let det = Detection::from_raw(&complete_raw()).unwrap();
        assert_eq!(det.label(), "rust 87.0%");
    }

    #[test]
    fn prediction_confidence_is_a_percentage_rounded_to_two_decimals() {
        let mut raw = complete_raw();
        raw.confidence = 0.87654;
        let det = Detection::from_raw(&raw).unwrap();

        let prediction = AnnotatedPrediction::from(&det);
        assert_eq!(prediction.confidence, 87.65);
        assert_eq!(prediction.class, "rust");
    }

    #[test]
    fn mode_parsing_defaults_to_disease() {
        assert_eq!(DetectionMode::parse("corn"), DetectionMode::Corn);
        assert_eq!(DetectionMode::parse("disease"), DetectionMode::Disease);
        assert_eq!(DetectionMode::parse("anything"), DetectionMode::Disease);
        assert_eq!(DetectionMode::default(), DetectionMode::Disease);
    }

    #[test]
    fn count_serializes_as_null_outside_corn_mode() {
        let response = PredictResponse {
            mode: DetectionMode::Disease,
            count: None,
            predictions: vec![],
            image_url: "/result-image/leaf.jpg".to_string(),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["mode"], "disease");
        assert_eq!(value["count"], serde_json::Value::Null);
        assert_eq!(value["image_url"], "/result-image/leaf.jpg");
    }

    #[test]
    fn count_serializes_as_number_in_corn_mode() {
        let response = PredictResponse {
            mode: DetectionMode::Corn,
            count: Some(12),
            predictions: vec![],
            image_url: "/result-image/field.jpg".to_string(),
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["mode"], "corn");
        assert_eq!(value["count"], 12);
    }
}
