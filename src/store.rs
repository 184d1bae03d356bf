//! The final mask of the active image.
//!
//! Every mutation goes through the persistence backend in two halves: a
//! `begin_*` call validates input and sets the loading flag, and the matching
//! `complete_*` call applies the backend's answer. The `async` helpers chain
//! both around the backend call. Between the halves the image may change, in
//! which case the answer is discarded as stale.

use std::collections::HashMap;

use crate::contour::{Contour, ContourId, ContourRecord, Mask, MaskRecord};
use crate::error::{ServiceError, SessionError};
use crate::pending::{Operation, PendingOps, Ticket};
use crate::services::{ImageId, ImageInfo, MaskPersistence, OpStatus};

/// A validated request waiting for the backend.
#[derive(Debug, Clone)]
pub struct PendingRequest<T> {
    pub ticket: Ticket,
    pub image_id: ImageId,
    pub payload: T,
}

/// Summed measurements over the contours that carry them.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuantificationSummary {
    pub area: f64,
    pub perimeter: f64,
    /// Contours that contributed measurements
    pub measured: usize,
    pub total: usize,
}

/// Ordered accepted contours of one image.
#[derive(Debug, Clone, Default)]
pub struct FinalMaskStore {
    image: Option<ImageInfo>,
    mask: Mask,
    selected: Option<ContourId>,
    pending: PendingOps,
}

impl FinalMaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to another image. The local mask is dropped and any request
    /// still in flight for the previous image becomes stale.
    pub fn set_image(&mut self, image: Option<ImageInfo>) {
        self.image = image;
        self.mask = Mask::default();
        self.selected = None;
        self.pending.invalidate();
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn mask(&self) -> &Mask {
        &self.mask
    }

    pub fn contours(&self) -> &[Contour] {
        &self.mask.contours
    }

    pub fn len(&self) -> usize {
        self.mask.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mask.is_empty()
    }

    pub fn is_loading(&self, operation: Operation) -> bool {
        self.pending.is_loading(operation)
    }

    pub fn get(&self, id: &str) -> Option<&Contour> {
        self.mask
            .contours
            .iter()
            .find(|c| c.id.as_deref() == Some(id))
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.mask
            .contours
            .iter()
            .position(|c| c.id.as_deref() == Some(id))
    }

    /// Highlight a contour by id. Returns the contour if it exists.
    pub fn select(&mut self, id: &str) -> Option<&Contour> {
        let index = self.position(id)?;
        self.selected = Some(id.to_string());
        self.mask.contours.get(index)
    }

    pub fn deselect(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&ContourId> {
        self.selected.as_ref()
    }

    /// Display names in mask order. Labels shared by several contours are
    /// numbered in encounter order; unique labels stay bare.
    pub fn display_names(&self) -> Vec<String> {
        let mut totals: HashMap<&str, usize> = HashMap::new();
        for contour in &self.mask.contours {
            *totals.entry(contour.label_name.as_str()).or_default() += 1;
        }

        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.mask
            .contours
            .iter()
            .map(|contour| {
                let name = contour.label_name.as_str();
                if totals.get(name).copied().unwrap_or(0) > 1 {
                    let n = seen.entry(name).or_default();
                    *n += 1;
                    format!("{name} #{n}")
                } else {
                    name.to_string()
                }
            })
            .collect()
    }

    pub fn quantification_summary(&self) -> QuantificationSummary {
        self.mask.contours.iter().fold(
            QuantificationSummary {
                total: self.mask.len(),
                ..Default::default()
            },
            |mut acc, contour| {
                if let Some(q) = contour.quantification {
                    acc.area += q.area;
                    acc.perimeter += q.perimeter;
                    acc.measured += 1;
                }
                acc
            },
        )
    }

    fn active_image(&self) -> Result<&ImageInfo, SessionError> {
        self.image.as_ref().ok_or(SessionError::NoImage)
    }

    fn begin<T>(
        &mut self,
        operation: Operation,
        payload: T,
    ) -> Result<PendingRequest<T>, SessionError> {
        let image_id = self.active_image()?.id.clone();
        let ticket = self.pending.begin(operation)?;
        Ok(PendingRequest {
            ticket,
            image_id,
            payload,
        })
    }

    /// Clear the loading flag, then surface staleness or the service error.
    fn settle<T>(
        &mut self,
        ticket: Ticket,
        result: Result<T, ServiceError>,
    ) -> Result<T, SessionError> {
        self.pending.finish(ticket)?;
        result.map_err(|e| {
            log::warn!("{} failed: {}", ticket.operation, e);
            SessionError::service(ticket.operation, e)
        })
    }

    fn settle_status(
        &mut self,
        ticket: Ticket,
        result: Result<OpStatus, ServiceError>,
    ) -> Result<OpStatus, SessionError> {
        let status = self.settle(ticket, result)?;
        if !status.success {
            log::warn!("{} refused: {}", ticket.operation, status.message);
            return Err(SessionError::service(
                ticket.operation,
                ServiceError::rejected(status.message),
            ));
        }
        Ok(status)
    }

    fn replace_mask(
        &mut self,
        record: MaskRecord,
        operation: Operation,
    ) -> Result<(), SessionError> {
        let size = self.active_image()?.size;
        let mask = Mask::from_record(record, size)
            .map_err(|e| SessionError::service(operation, e.into()))?;
        let still_present = self
            .selected
            .as_ref()
            .is_none_or(|id| mask.contours.iter().any(|c| c.id.as_ref() == Some(id)));
        if !still_present {
            self.selected = None;
        }
        self.mask = mask;
        Ok(())
    }

    pub fn begin_load(&mut self) -> Result<PendingRequest<()>, SessionError> {
        self.begin(Operation::FetchMask, ())
    }

    pub fn complete_load(
        &mut self,
        ticket: Ticket,
        result: Result<MaskRecord, ServiceError>,
    ) -> Result<usize, SessionError> {
        let record = self.settle(ticket, result)?;
        self.replace_mask(record, Operation::FetchMask)?;
        log::info!("Loaded final mask with {} contour(s)", self.len());
        Ok(self.len())
    }

    /// Fetch the stored mask of the active image.
    pub async fn load(&mut self, backend: &impl MaskPersistence) -> Result<usize, SessionError> {
        let request = self.begin_load()?;
        let result = backend.fetch(&request.image_id).await;
        self.complete_load(request.ticket, result)
    }

    /// Validate contours for saving and convert them to wire form.
    pub fn begin_add(
        &mut self,
        contours: Vec<Contour>,
    ) -> Result<PendingRequest<Vec<ContourRecord>>, SessionError> {
        if contours.is_empty() {
            return Err(SessionError::invalid_input("No contours to add"));
        }
        if contours.iter().any(|c| c.label_name.trim().is_empty()) {
            return Err(SessionError::invalid_input(
                "Every contour needs a label name before saving",
            ));
        }
        let size = self.active_image()?.size;
        let records = contours.iter().map(|c| c.to_record(size)).collect();
        self.begin(Operation::AddContours, records)
    }

    /// Apply the backend's updated mask. Returns the new contour count.
    pub fn complete_add(
        &mut self,
        ticket: Ticket,
        result: Result<MaskRecord, ServiceError>,
    ) -> Result<usize, SessionError> {
        let record = self.settle(ticket, result)?;
        let before = self.len();
        self.replace_mask(record, Operation::AddContours)?;
        log::info!(
            "Final mask now has {} contour(s) ({} before)",
            self.len(),
            before
        );
        Ok(self.len())
    }

    pub async fn add_contours(
        &mut self,
        backend: &impl MaskPersistence,
        contours: Vec<Contour>,
    ) -> Result<usize, SessionError> {
        let request = self.begin_add(contours)?;
        let result = backend
            .add_contours(&request.image_id, request.payload)
            .await;
        self.complete_add(request.ticket, result)
    }

    pub fn begin_remove(&mut self, id: &str) -> Result<PendingRequest<ContourId>, SessionError> {
        if self.position(id).is_none() {
            return Err(SessionError::invalid_input(format!(
                "Contour {id} is not in the final mask"
            )));
        }
        self.begin(Operation::RemoveContour, id.to_string())
    }

    pub fn complete_remove(
        &mut self,
        ticket: Ticket,
        id: &str,
        result: Result<OpStatus, ServiceError>,
    ) -> Result<OpStatus, SessionError> {
        let status = self.settle_status(ticket, result)?;
        self.mask.contours.retain(|c| c.id.as_deref() != Some(id));
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        log::info!("{}", status.message);
        Ok(status)
    }

    pub async fn remove_contour(
        &mut self,
        backend: &impl MaskPersistence,
        id: &str,
    ) -> Result<OpStatus, SessionError> {
        let request = self.begin_remove(id)?;
        let result = backend
            .delete_contour(&request.image_id, &request.payload)
            .await;
        self.complete_remove(request.ticket, id, result)
    }

    /// Start clearing the mask. The caller is expected to have confirmed.
    pub fn begin_clear(&mut self) -> Result<PendingRequest<MaskRecord>, SessionError> {
        let size = self.active_image()?.size;
        let record = self.mask.to_record(size);
        self.begin(Operation::ClearAll, record)
    }

    pub fn complete_clear(
        &mut self,
        ticket: Ticket,
        result: Result<OpStatus, ServiceError>,
    ) -> Result<OpStatus, SessionError> {
        let status = self.settle_status(ticket, result)?;
        self.mask.contours.clear();
        self.selected = None;
        log::info!("{}", status.message);
        Ok(status)
    }

    pub async fn clear_all(
        &mut self,
        backend: &impl MaskPersistence,
    ) -> Result<OpStatus, SessionError> {
        let request = self.begin_clear()?;
        let result = backend.clear_all(&request.payload, &request.image_id).await;
        self.complete_clear(request.ticket, result)
    }
}
