//! External collaborator interfaces.
//!
//! The canvas core never performs inference or persistence itself. These
//! traits describe what it needs from the outside; methods return futures so
//! a network-backed implementation can await its transport while the UI keeps
//! running.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::contour::{ContourId, ContourRecord, MaskRecord};
use crate::error::ServiceError;
use crate::geometry::ImageSize;
use crate::prompt::ExportedPrompt;

/// Identifier of an image as known to the image provider.
pub type ImageId = String;

/// A decoded image as delivered by the image provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: ImageId,
    pub size: ImageSize,
}

impl ImageInfo {
    pub fn new(id: impl Into<ImageId>, width: u32, height: u32) -> Self {
        Self {
            id: id.into(),
            size: ImageSize::new(width, height),
        }
    }

    /// Take the pixel dimensions from a decoded bitmap.
    pub fn from_dynamic(id: impl Into<ImageId>, image: &image::DynamicImage) -> Self {
        Self::new(id, image.width(), image.height())
    }
}

/// Payload sent to the segmentation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationRequest {
    pub image_id: ImageId,
    pub prompts: Vec<ExportedPrompt>,
}

/// Candidate contours returned by the segmentation service.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SegmentationResponse {
    #[serde(default)]
    pub mask_id: Option<String>,
    pub contours: Vec<ContourRecord>,
    #[serde(default)]
    pub scores: Vec<f32>,
}

/// `{success, message}` acknowledgement from the persistence backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpStatus {
    pub success: bool,
    pub message: String,
}

impl OpStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// The external segmentation model.
pub trait SegmentationService {
    fn segment(
        &self,
        request: SegmentationRequest,
    ) -> impl Future<Output = Result<SegmentationResponse, ServiceError>>;
}

/// The backend holding each image's final mask.
pub trait MaskPersistence {
    fn fetch(&self, image_id: &str) -> impl Future<Output = Result<MaskRecord, ServiceError>>;

    fn add_contours(
        &self,
        image_id: &str,
        contours: Vec<ContourRecord>,
    ) -> impl Future<Output = Result<MaskRecord, ServiceError>>;

    fn delete_contour(
        &self,
        image_id: &str,
        contour_id: &str,
    ) -> impl Future<Output = Result<OpStatus, ServiceError>>;

    fn clear_all(
        &self,
        mask: &MaskRecord,
        image_id: &str,
    ) -> impl Future<Output = Result<OpStatus, ServiceError>>;
}

/// In-process [`MaskPersistence`] used by the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryMaskStore {
    masks: RefCell<HashMap<ImageId, MaskRecord>>,
    next_id: RefCell<u64>,
}

impl MemoryMaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing mask.
    pub fn insert(&self, image_id: impl Into<ImageId>, mask: MaskRecord) {
        self.masks.borrow_mut().insert(image_id.into(), mask);
    }

    pub fn snapshot(&self, image_id: &str) -> Option<MaskRecord> {
        self.masks.borrow().get(image_id).cloned()
    }

    fn fresh_id(&self, prefix: &str) -> String {
        let mut next = self.next_id.borrow_mut();
        *next += 1;
        format!("{prefix}-{next}")
    }

    fn mask_for(&self, image_id: &str) -> MaskRecord {
        self.masks
            .borrow()
            .get(image_id)
            .cloned()
            .unwrap_or_else(|| MaskRecord {
                id: format!("mask-{image_id}"),
                contours: Vec::new(),
            })
    }
}

impl MaskPersistence for MemoryMaskStore {
    async fn fetch(&self, image_id: &str) -> Result<MaskRecord, ServiceError> {
        Ok(self.mask_for(image_id))
    }

    async fn add_contours(
        &self,
        image_id: &str,
        contours: Vec<ContourRecord>,
    ) -> Result<MaskRecord, ServiceError> {
        let mut mask = self.mask_for(image_id);
        for mut contour in contours {
            if contour.id.is_none() {
                contour.id = Some(self.fresh_id("contour"));
            }
            mask.contours.push(contour);
        }
        self.masks
            .borrow_mut()
            .insert(image_id.to_string(), mask.clone());
        Ok(mask)
    }

    async fn delete_contour(
        &self,
        image_id: &str,
        contour_id: &str,
    ) -> Result<OpStatus, ServiceError> {
        let mut masks = self.masks.borrow_mut();
        let mask = masks
            .get_mut(image_id)
            .ok_or_else(|| ServiceError::ContourNotFound {
                id: contour_id.to_string(),
            })?;
        let before = mask.contours.len();
        mask.contours
            .retain(|c| c.id.as_deref() != Some(contour_id));
        if mask.contours.len() == before {
            return Err(ServiceError::ContourNotFound {
                id: contour_id.to_string(),
            });
        }
        Ok(OpStatus::ok(format!("Deleted contour {contour_id}")))
    }

    async fn clear_all(&self, mask: &MaskRecord, image_id: &str) -> Result<OpStatus, ServiceError> {
        let mut masks = self.masks.borrow_mut();
        let stored = masks.entry(image_id.to_string()).or_insert_with(|| MaskRecord {
            id: mask.id.clone(),
            contours: Vec::new(),
        });
        let removed = stored.contours.len();
        stored.contours.clear();
        Ok(OpStatus::ok(format!(
            "Cleared {removed} contour(s) from mask {}",
            mask.id
        )))
    }
}

/// A segmentation service answering from a fixed queue of responses.
///
/// Useful for replaying recorded sessions.
#[derive(Debug, Default)]
pub struct ScriptedSegmenter {
    responses: RefCell<Vec<Result<SegmentationResponse, ServiceError>>>,
    requests: RefCell<Vec<SegmentationRequest>>,
}

impl ScriptedSegmenter {
    pub fn new(responses: Vec<Result<SegmentationResponse, ServiceError>>) -> Self {
        Self {
            responses: RefCell::new(responses.into_iter().rev().collect()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<SegmentationRequest> {
        self.requests.borrow().clone()
    }
}

impl SegmentationService for ScriptedSegmenter {
    async fn segment(
        &self,
        request: SegmentationRequest,
    ) -> Result<SegmentationResponse, ServiceError> {
        self.requests.borrow_mut().push(request);
        self.responses
            .borrow_mut()
            .pop()
            .unwrap_or_else(|| Err(ServiceError::Unavailable("no scripted response left".into())))
    }
}

/// Contour ids present in a mask, in order.
pub fn contour_ids(mask: &MaskRecord) -> Vec<ContourId> {
    mask.contours.iter().filter_map(|c| c.id.clone()).collect()
}
