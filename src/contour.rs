//! Contour and mask data model.
//!
//! On the wire a contour is a pair of parallel `x`/`y` arrays holding image
//! fractions. Inside the crate a [`Contour`] holds image-pixel points; the
//! conversions live here and nowhere else.

use serde::{Deserialize, Serialize};

use crate::constants::MIN_CLOSED_POINTS;
use crate::geometry::{BoundingBox, ImageSize, Point};
use crate::prompt::Label;

/// Identifier of a persisted contour.
pub type ContourId = String;

/// Identifier of a mask (candidate or final).
pub type MaskId = String;

/// Errors raised while importing wire contours.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ContourError {
    /// `x` and `y` arrays differ in length
    #[error("Contour '{id}' has {x_len} x values but {y_len} y values")]
    MismatchedArrays {
        id: String,
        x_len: usize,
        y_len: usize,
    },

    /// Image size unusable for coordinate conversion
    #[error("Cannot convert contour coordinates for an empty {width}x{height} image")]
    EmptyImage { width: u32, height: u32 },
}

/// Measurements supplied by the quantification provider. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Quantification {
    pub area: f64,
    pub perimeter: f64,
    #[serde(default)]
    pub circularity: Option<f64>,
    /// Major and minor diameters
    #[serde(default)]
    pub diameters: Option<(f64, f64)>,
}

/// A contour as exchanged with external services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContourRecord {
    #[serde(default)]
    pub id: Option<ContourId>,
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    #[serde(default)]
    pub label: Label,
    #[serde(default)]
    pub label_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantification: Option<Quantification>,
}

/// A region outline in image-pixel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    pub id: Option<ContourId>,
    pub points: Vec<Point>,
    pub label: Label,
    pub label_name: String,
    pub quantification: Option<Quantification>,
}

impl Contour {
    pub fn new(points: Vec<Point>, label: Label, label_name: impl Into<String>) -> Self {
        Self {
            id: None,
            points,
            label,
            label_name: label_name.into(),
            quantification: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<ContourId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_quantification(mut self, quantification: Quantification) -> Self {
        self.quantification = Some(quantification);
        self
    }

    /// Import a wire contour, converting fractions to pixels.
    pub fn from_record(record: ContourRecord, image: ImageSize) -> Result<Self, ContourError> {
        if image.is_empty() {
            return Err(ContourError::EmptyImage {
                width: image.width,
                height: image.height,
            });
        }
        if record.x.len() != record.y.len() {
            return Err(ContourError::MismatchedArrays {
                id: record.id.unwrap_or_default(),
                x_len: record.x.len(),
                y_len: record.y.len(),
            });
        }
        let points = record
            .x
            .iter()
            .zip(&record.y)
            .map(|(&x, &y)| image.to_pixels(Point::new(x, y)))
            .collect();
        Ok(Self {
            id: record.id,
            points,
            label: record.label,
            label_name: record.label_name,
            quantification: record.quantification,
        })
    }

    /// Export to the wire form, converting pixels to fractions.
    pub fn to_record(&self, image: ImageSize) -> ContourRecord {
        let (x, y) = self
            .points
            .iter()
            .map(|p| {
                let f = image.to_fraction(*p);
                (f.x, f.y)
            })
            .unzip();
        ContourRecord {
            id: self.id.clone(),
            x,
            y,
            label: self.label,
            label_name: self.label_name.clone(),
            quantification: self.quantification,
        }
    }

    /// Whether the contour has enough points to form a closed region.
    pub fn is_closed(&self) -> bool {
        self.points.len() >= MIN_CLOSED_POINTS
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        BoundingBox::enclosing(&self.points)
    }

    /// Bounding box as image fractions.
    pub fn fraction_bounding_box(&self, image: ImageSize) -> Option<BoundingBox> {
        let bbox = self.bounding_box()?;
        let top_left = image.to_fraction(Point::new(bbox.x, bbox.y));
        Some(BoundingBox::new(
            top_left.x,
            top_left.y,
            bbox.width / image.width_f(),
            bbox.height / image.height_f(),
        ))
    }
}

/// Wire form of a mask.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaskRecord {
    pub id: MaskId,
    #[serde(default)]
    pub contours: Vec<ContourRecord>,
}

/// A set of contours for one image.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mask {
    pub id: MaskId,
    pub contours: Vec<Contour>,
}

impl Mask {
    pub fn new(id: impl Into<MaskId>) -> Self {
        Self {
            id: id.into(),
            contours: Vec::new(),
        }
    }

    pub fn from_record(record: MaskRecord, image: ImageSize) -> Result<Self, ContourError> {
        let contours = record
            .contours
            .into_iter()
            .map(|c| Contour::from_record(c, image))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            id: record.id,
            contours,
        })
    }

    pub fn to_record(&self, image: ImageSize) -> MaskRecord {
        MaskRecord {
            id: self.id.clone(),
            contours: self.contours.iter().map(|c| c.to_record(image)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.contours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contours.is_empty()
    }
}

/// Review status of a candidate contour.
///
/// Rejecting keeps the candidate on record but hides it; deleting removes it
/// from the candidate mask entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReviewStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// A candidate contour returned by segmentation.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub contour: Contour,
    pub score: Option<f32>,
    pub status: ReviewStatus,
}

/// A candidate mask with per-contour review state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CandidateMask {
    pub id: MaskId,
    pub candidates: Vec<Candidate>,
}

impl CandidateMask {
    pub fn new(id: impl Into<MaskId>, contours: Vec<Contour>, scores: &[f32]) -> Self {
        let candidates = contours
            .into_iter()
            .enumerate()
            .map(|(i, contour)| Candidate {
                contour,
                score: scores.get(i).copied(),
                status: ReviewStatus::Pending,
            })
            .collect();
        Self {
            id: id.into(),
            candidates,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    /// Candidates that are still shown (not rejected), with their indices.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Candidate)> {
        self.candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.status != ReviewStatus::Rejected)
    }

    pub fn set_status(&mut self, index: usize, status: ReviewStatus) -> bool {
        match self.candidates.get_mut(index) {
            Some(candidate) => {
                candidate.status = status;
                true
            }
            None => false,
        }
    }

    /// Remove a candidate. Later indices shift down by one.
    pub fn delete(&mut self, index: usize) -> Option<Candidate> {
        (index < self.candidates.len()).then(|| self.candidates.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: Vec<f32>, y: Vec<f32>) -> ContourRecord {
        ContourRecord {
            id: Some("c1".to_string()),
            x,
            y,
            label: Label(3),
            label_name: "Coral".to_string(),
            quantification: None,
        }
    }

    #[test]
    fn test_record_import_converts_to_pixels() {
        let size = ImageSize::new(200, 100);
        let contour =
            Contour::from_record(record(vec![0.0, 0.5, 0.5], vec![0.0, 0.0, 1.0]), size).unwrap();
        assert_eq!(
            contour.points,
            vec![
                Point::new(0.0, 0.0),
                Point::new(100.0, 0.0),
                Point::new(100.0, 100.0)
            ]
        );
        assert!(contour.is_closed());
        assert_eq!(contour.to_record(size).x, vec![0.0, 0.5, 0.5]);
    }

    #[test]
    fn test_mismatched_arrays_rejected() {
        let err = Contour::from_record(record(vec![0.0, 1.0], vec![0.0]), ImageSize::new(10, 10))
            .unwrap_err();
        assert!(matches!(err, ContourError::MismatchedArrays { x_len: 2, y_len: 1, .. }));
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = Contour::from_record(record(vec![0.0], vec![0.0]), ImageSize::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, ContourError::EmptyImage { .. }));
    }

    #[test]
    fn test_fraction_bounding_box() {
        let size = ImageSize::new(200, 100);
        let contour = Contour::new(
            vec![
                Point::new(20.0, 10.0),
                Point::new(60.0, 10.0),
                Point::new(60.0, 30.0),
            ],
            Label::FOREGROUND,
            "Coral",
        );
        let bbox = contour.fraction_bounding_box(size).unwrap();
        assert_eq!(bbox, BoundingBox::new(0.1, 0.1, 0.2, 0.2));
    }

    #[test]
    fn test_record_json_shape() {
        let json = r#"{"id":"a","x":[0.1,0.2,0.3],"y":[0.1,0.2,0.1],"label":1,"label_name":"Coral"}"#;
        let rec: ContourRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.label, Label::FOREGROUND);
        assert!(rec.quantification.is_none());
    }

    #[test]
    fn test_candidate_reject_and_delete_differ() {
        let contour = Contour::new(vec![Point::new(0.0, 0.0)], Label::FOREGROUND, "A");
        let mut mask = CandidateMask::new("m", vec![contour.clone(), contour], &[0.9]);
        assert_eq!(mask.candidates[0].score, Some(0.9));
        assert_eq!(mask.candidates[1].score, None);

        mask.set_status(0, ReviewStatus::Rejected);
        assert_eq!(mask.candidates.len(), 2);
        assert_eq!(mask.visible().count(), 1);

        assert!(mask.delete(0).is_some());
        assert_eq!(mask.candidates.len(), 1);
        assert!(mask.delete(5).is_none());
    }
}
