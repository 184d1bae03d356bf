//! One annotation session over the active image.
//!
//! [`Session`] wires the prompt capture, candidate review, final mask and
//! zoom synchronization together and builds the scenes both canvases draw.

use crate::capture::{CaptureOutcome, PromptCapture};
use crate::config::CanvasConfig;
use crate::contour::{Candidate, CandidateMask, Contour, ReviewStatus};
use crate::error::{ServiceError, SessionError};
use crate::geometry::{ImageSize, Point};
use crate::input::InputController;
use crate::pending::{Operation, PendingOps, Ticket};
use crate::render::{DrawCommand, Scene, SceneContour, render};
use crate::services::{
    ImageInfo, MaskPersistence, OpStatus, SegmentationRequest, SegmentationResponse,
    SegmentationService,
};
use crate::store::{FinalMaskStore, PendingRequest};
use crate::sync::{CanvasKind, SelectionRef, SyncUpdate, ZoomSelectionSync};
use crate::transform::{ViewTransform, ZoomState};

/// State behind the drawing and final-mask canvases.
#[derive(Debug, Clone)]
pub struct Session {
    config: CanvasConfig,
    image: Option<ImageInfo>,
    drawing_viewport: ImageSize,
    final_viewport: ImageSize,
    capture: PromptCapture,
    candidates: Option<CandidateMask>,
    store: FinalMaskStore,
    sync: ZoomSelectionSync,
    pending: PendingOps,
    segment_count: u64,
}

impl Session {
    pub fn new(config: CanvasConfig) -> Self {
        let mut input = InputController::new(config.modifier);
        input.attach();
        let capture = PromptCapture::new(input, config.zoom.drawing, config.keybindings.clone());
        let sync = ZoomSelectionSync::new(
            (config.zoom.drawing.min, config.zoom.drawing.max),
            config.zoom.final_min,
            config.zoom.fit_margin,
        );
        Self {
            config,
            image: None,
            drawing_viewport: ImageSize::default(),
            final_viewport: ImageSize::default(),
            capture,
            candidates: None,
            store: FinalMaskStore::new(),
            sync,
            pending: PendingOps::new(),
            segment_count: 0,
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn image(&self) -> Option<&ImageInfo> {
        self.image.as_ref()
    }

    pub fn capture(&self) -> &PromptCapture {
        &self.capture
    }

    pub fn candidates(&self) -> Option<&CandidateMask> {
        self.candidates.as_ref()
    }

    pub fn store(&self) -> &FinalMaskStore {
        &self.store
    }

    pub fn sync(&self) -> &ZoomSelectionSync {
        &self.sync
    }

    pub fn selection(&self) -> Option<&SelectionRef> {
        self.sync.selection()
    }

    pub fn is_loading(&self, operation: Operation) -> bool {
        self.pending.is_loading(operation) || self.store.is_loading(operation)
    }

    /// Canvas sizes in screen pixels.
    pub fn set_viewports(&mut self, drawing: ImageSize, final_mask: ImageSize) {
        self.drawing_viewport = drawing;
        self.final_viewport = final_mask;
        self.sync_drawing_view();
        self.sync.request_redraw();
    }

    // ========================================================================
    // Image lifecycle
    // ========================================================================

    /// Make another image active. Prompts, candidates, the final mask,
    /// selection and zoom all reset, and in-flight responses become stale.
    pub fn set_image(&mut self, image: Option<ImageInfo>) {
        match &image {
            Some(info) => log::info!(
                "Active image {} ({}x{})",
                info.id,
                info.size.width,
                info.size.height
            ),
            None => log::info!("Active image cleared"),
        }
        self.capture.reset();
        self.candidates = None;
        self.store.set_image(image.clone());
        self.sync.reset_for_image();
        self.pending.invalidate();
        self.image = image;
        self.sync_drawing_view();
        self.sync.request_redraw();
    }

    /// The canvas's bitmap is decoded. Returns true if a frame is due.
    pub fn image_ready(&mut self, kind: CanvasKind) -> bool {
        self.sync.image_ready(kind)
    }

    /// Clear prompts, selection and zoom in one call.
    pub fn reset(&mut self) {
        self.capture.reset();
        self.store.deselect();
        self.sync.deselect();
        self.pending.invalidate();
        self.sync_drawing_view();
        log::debug!("Session reset");
    }

    // ========================================================================
    // Drawing canvas input
    // ========================================================================

    /// Run an input event through the prompt capture.
    ///
    /// ```ignore
    /// session.input(|capture| capture.pointer_down(at, PointerButton::Primary));
    /// ```
    pub fn input<F>(&mut self, event: F) -> CaptureOutcome
    where
        F: FnOnce(&mut PromptCapture) -> CaptureOutcome,
    {
        let before = self.capture.view();
        let outcome = event(&mut self.capture);
        if self.capture.view() != before
            && let Some(image) = &self.image
        {
            let zoom = self
                .capture
                .view()
                .to_zoom_state(self.drawing_viewport, image.size);
            self.sync.update_local(CanvasKind::Drawing, zoom);
        } else if outcome != CaptureOutcome::Unchanged {
            self.sync.canvas_mut(CanvasKind::Drawing).redraw.request();
        }
        outcome
    }

    /// Point the drawing canvas's view at the shared zoom state.
    fn sync_drawing_view(&mut self) {
        let Some(image) = &self.image else {
            self.capture.set_view(ViewTransform::identity());
            return;
        };
        let zoom = self.sync.canvas(CanvasKind::Drawing).zoom;
        let view = if zoom.is_reset() && self.drawing_viewport.is_empty() {
            ViewTransform::identity()
        } else {
            zoom.to_view(self.drawing_viewport, image.size)
        };
        self.capture.set_view(view);
    }

    // ========================================================================
    // Segmentation
    // ========================================================================

    /// Validate the prompts and build the request.
    pub fn begin_segmentation(
        &mut self,
    ) -> Result<PendingRequest<SegmentationRequest>, SessionError> {
        let image = self.image.as_ref().ok_or(SessionError::NoImage)?;
        if self.capture.prompts().is_empty() {
            return Err(SessionError::invalid_input(
                "Add at least one prompt before segmenting",
            ));
        }
        let request = SegmentationRequest {
            image_id: image.id.clone(),
            prompts: self.capture.export(image.size),
        };
        let image_id = image.id.clone();
        let ticket = self.pending.begin(Operation::Segment)?;
        log::debug!(
            "Segmenting {} with {} prompt(s)",
            image_id,
            request.prompts.len()
        );
        Ok(PendingRequest {
            ticket,
            image_id,
            payload: request,
        })
    }

    /// Apply the service's candidates. Prompts are discarded once they
    /// produced a result; on failure they stay so the user can retry.
    pub fn complete_segmentation(
        &mut self,
        ticket: Ticket,
        result: Result<SegmentationResponse, ServiceError>,
    ) -> Result<usize, SessionError> {
        self.pending.finish(ticket)?;
        let response = result.map_err(|e| {
            log::warn!("Segmentation failed: {}", e);
            SessionError::service(Operation::Segment, e)
        })?;
        let size = self.image.as_ref().ok_or(SessionError::NoImage)?.size;

        let contours = response
            .contours
            .into_iter()
            .map(|record| Contour::from_record(record, size))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SessionError::service(Operation::Segment, e.into()))?;

        self.segment_count += 1;
        let mask_id = response
            .mask_id
            .unwrap_or_else(|| format!("candidates-{}", self.segment_count));
        let count = contours.len();
        log::info!("Segmentation returned {} candidate(s) as {}", count, mask_id);

        if matches!(self.sync.selection(), Some(SelectionRef::Candidate { .. })) {
            self.sync.deselect();
            self.sync_drawing_view();
        }
        self.candidates = Some(CandidateMask::new(mask_id, contours, &response.scores));
        self.capture.clear();
        self.sync.request_redraw();
        Ok(count)
    }

    pub async fn segment_with(
        &mut self,
        service: &impl SegmentationService,
    ) -> Result<usize, SessionError> {
        let request = self.begin_segmentation()?;
        let result = service.segment(request.payload).await;
        self.complete_segmentation(request.ticket, result)
    }

    // ========================================================================
    // Candidate review
    // ========================================================================

    fn candidate(&self, index: usize) -> Result<&Candidate, SessionError> {
        self.candidates
            .as_ref()
            .and_then(|mask| mask.get(index))
            .ok_or_else(|| SessionError::invalid_input(format!("No candidate #{}", index + 1)))
    }

    /// Save candidates to the final mask and mark them accepted.
    /// Rejected candidates are skipped.
    pub async fn accept_candidates(
        &mut self,
        backend: &impl MaskPersistence,
        indices: &[usize],
    ) -> Result<usize, SessionError> {
        let mut chosen = Vec::new();
        for &index in indices {
            let candidate = self.candidate(index)?;
            if candidate.status != ReviewStatus::Rejected {
                chosen.push((index, candidate.contour.clone()));
            }
        }
        let contours = chosen.iter().map(|(_, c)| c.clone()).collect();
        let total = self.store.add_contours(backend, contours).await?;

        if let Some(mask) = &mut self.candidates {
            for (index, _) in &chosen {
                mask.set_status(*index, ReviewStatus::Accepted);
            }
        }
        self.sync.request_redraw();
        Ok(total)
    }

    /// Mark a candidate rejected. It stays on record but is no longer drawn.
    pub fn reject_candidate(&mut self, index: usize) -> Result<(), SessionError> {
        self.candidate(index)?;
        if let Some(mask) = &mut self.candidates {
            mask.set_status(index, ReviewStatus::Rejected);
        }
        if self.selected_candidate() == Some(index) {
            self.deselect();
        }
        self.sync.request_redraw();
        Ok(())
    }

    /// Remove a candidate from the candidate mask.
    pub fn delete_candidate(&mut self, index: usize) -> Result<Candidate, SessionError> {
        self.candidate(index)?;
        let Some(mask) = &mut self.candidates else {
            return Err(SessionError::invalid_input("No candidates"));
        };
        let mask_id = mask.id.clone();
        let removed = mask
            .delete(index)
            .ok_or_else(|| SessionError::invalid_input(format!("No candidate #{}", index + 1)))?;

        match self.selected_candidate() {
            Some(selected) if selected == index => {
                self.deselect();
            }
            Some(selected) if selected > index => self.sync.retarget(SelectionRef::Candidate {
                mask_id,
                index: selected - 1,
            }),
            _ => self.sync.request_redraw(),
        }
        Ok(removed)
    }

    fn selected_candidate(&self) -> Option<usize> {
        match self.sync.selection() {
            Some(SelectionRef::Candidate { index, .. }) => Some(*index),
            _ => None,
        }
    }

    // ========================================================================
    // Final mask
    // ========================================================================

    pub async fn load_final_mask(
        &mut self,
        backend: &impl MaskPersistence,
    ) -> Result<usize, SessionError> {
        let count = self.store.load(backend).await?;
        self.sync.canvas_mut(CanvasKind::FinalMask).redraw.request();
        Ok(count)
    }

    pub async fn add_final_contours(
        &mut self,
        backend: &impl MaskPersistence,
        contours: Vec<Contour>,
    ) -> Result<usize, SessionError> {
        let count = self.store.add_contours(backend, contours).await?;
        self.sync.canvas_mut(CanvasKind::FinalMask).redraw.request();
        Ok(count)
    }

    pub async fn remove_final_contour(
        &mut self,
        backend: &impl MaskPersistence,
        id: &str,
    ) -> Result<OpStatus, SessionError> {
        let was_selected = matches!(
            self.sync.selection(),
            Some(SelectionRef::Final { contour_id }) if contour_id == id
        );
        let status = self.store.remove_contour(backend, id).await?;
        if was_selected {
            self.deselect();
        } else {
            self.sync.request_redraw();
        }
        Ok(status)
    }

    /// Remove every final contour. The caller is expected to have confirmed.
    pub async fn clear_final_mask(
        &mut self,
        backend: &impl MaskPersistence,
    ) -> Result<OpStatus, SessionError> {
        let status = self.store.clear_all(backend).await?;
        if matches!(self.sync.selection(), Some(SelectionRef::Final { .. })) {
            self.deselect();
        } else {
            self.sync.request_redraw();
        }
        Ok(status)
    }

    // ========================================================================
    // Selection and zoom
    // ========================================================================

    fn select_contour(
        &mut self,
        selection: SelectionRef,
        contour: &Contour,
    ) -> Result<SyncUpdate, SessionError> {
        let size = self.image.as_ref().ok_or(SessionError::NoImage)?.size;
        let bbox = contour
            .fraction_bounding_box(size)
            .ok_or_else(|| SessionError::invalid_input("Contour has no points"))?;
        let update = self.sync.select(selection, &bbox);
        self.sync_drawing_view();
        Ok(update)
    }

    /// Highlight a candidate and zoom both canvases to it.
    pub fn select_candidate(&mut self, index: usize) -> Result<SyncUpdate, SessionError> {
        let candidate = self.candidate(index)?;
        if candidate.status == ReviewStatus::Rejected {
            return Err(SessionError::invalid_input(format!(
                "Candidate #{} was rejected",
                index + 1
            )));
        }
        let contour = candidate.contour.clone();
        let mask_id = self
            .candidates
            .as_ref()
            .map(|mask| mask.id.clone())
            .unwrap_or_default();
        self.store.deselect();
        self.select_contour(SelectionRef::Candidate { mask_id, index }, &contour)
    }

    /// Highlight a final-mask contour and zoom both canvases to it.
    pub fn select_final(&mut self, id: &str) -> Result<SyncUpdate, SessionError> {
        let contour = self
            .store
            .select(id)
            .cloned()
            .ok_or_else(|| SessionError::invalid_input(format!("Unknown contour {id}")))?;
        self.select_contour(
            SelectionRef::Final {
                contour_id: id.to_string(),
            },
            &contour,
        )
    }

    pub fn deselect(&mut self) -> SyncUpdate {
        self.store.deselect();
        let update = self.sync.deselect();
        self.sync_drawing_view();
        update
    }

    /// Zoom both canvases to a level and normalized center chosen elsewhere.
    pub fn apply_zoom(&mut self, level: f32, center: Point) -> SyncUpdate {
        let update = self.sync.apply_zoom(level, center);
        self.sync_drawing_view();
        update
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    fn ready_image(&self, kind: CanvasKind) -> Option<ImageSize> {
        self.image
            .as_ref()
            .filter(|_| self.sync.canvas(kind).redraw.is_ready())
            .map(|info| info.size)
    }

    /// Scene of the drawing canvas: visible candidates, prompts and preview.
    pub fn drawing_scene(&self) -> Scene<'_> {
        let mut scene = Scene::new(self.drawing_viewport, &self.config.palette);
        scene.settings = self.config.render;
        scene.image = self.ready_image(CanvasKind::Drawing);
        scene.view = self.capture.view();
        scene.prompts = self.capture.prompts();
        scene.preview = self.capture.preview();

        let selected = self.selected_candidate();
        if let Some(mask) = &self.candidates {
            for (index, candidate) in mask.visible() {
                let is_selected = selected == Some(index);
                if is_selected {
                    scene.spotlight = Some(scene.contours.len());
                }
                scene.contours.push(SceneContour {
                    contour: &candidate.contour,
                    number: index + 1,
                    selected: is_selected,
                });
            }
        }
        scene
    }

    /// Scene of the final-mask canvas.
    pub fn final_scene(&self) -> Scene<'_> {
        let mut scene = Scene::new(self.final_viewport, &self.config.palette);
        scene.settings = self.config.render;
        scene.image = self.ready_image(CanvasKind::FinalMask);
        if let Some(image) = &self.image {
            scene.view = self
                .sync
                .canvas(CanvasKind::FinalMask)
                .zoom
                .to_view(self.final_viewport, image.size);
        }

        let selected = self.store.selected();
        for (i, contour) in self.store.contours().iter().enumerate() {
            let is_selected = selected.is_some() && contour.id.as_ref() == selected;
            if is_selected {
                scene.spotlight = Some(i);
            }
            scene.contours.push(SceneContour {
                contour,
                number: i + 1,
                selected: is_selected,
            });
        }
        scene
    }

    /// Draw commands for a canvas if it has a frame due.
    pub fn take_frame(&mut self, kind: CanvasKind) -> Option<Vec<DrawCommand>> {
        self.sync.take_redraw(kind)?;
        let commands = match kind {
            CanvasKind::Drawing => render(&self.drawing_scene()),
            CanvasKind::FinalMask => render(&self.final_scene()),
        };
        Some(commands)
    }

    /// Current zoom of a canvas.
    pub fn zoom(&self, kind: CanvasKind) -> ZoomState {
        self.sync.canvas(kind).zoom
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(CanvasConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::PointerButton;
    use crate::contour::ContourRecord;
    use crate::prompt::Label;
    use crate::services::{MemoryMaskStore, ScriptedSegmenter};
    use pollster::block_on;

    fn square(x: f32, y: f32, side: f32) -> ContourRecord {
        ContourRecord {
            id: None,
            x: vec![x, x + side, x + side, x],
            y: vec![y, y, y + side, y + side],
            label: Label::FOREGROUND,
            label_name: "Coral".to_string(),
            quantification: None,
        }
    }

    fn ready_session() -> Session {
        let mut session = Session::default();
        session.set_viewports(ImageSize::new(400, 300), ImageSize::new(400, 300));
        session.set_image(Some(ImageInfo::new("img", 400, 300)));
        session.image_ready(CanvasKind::Drawing);
        session.image_ready(CanvasKind::FinalMask);
        session
    }

    fn click(session: &mut Session, x: f32, y: f32) {
        let at = Point::new(x, y);
        session.input(|c| c.pointer_down(at, PointerButton::Primary));
        session.input(|c| c.pointer_up(at, PointerButton::Primary));
    }

    fn segmented_session(contours: Vec<ContourRecord>) -> Session {
        let mut session = ready_session();
        click(&mut session, 50.0, 50.0);
        let segmenter = ScriptedSegmenter::new(vec![Ok(SegmentationResponse {
            mask_id: Some("cand".into()),
            contours,
            scores: vec![0.9],
        })]);
        block_on(session.segment_with(&segmenter)).unwrap();
        session
    }

    #[test]
    fn test_segment_requires_prompts() {
        let mut session = ready_session();
        assert!(matches!(
            session.begin_segmentation().map(|_| ()),
            Err(SessionError::InvalidInput { .. })
        ));
        assert!(!session.is_loading(Operation::Segment));
    }

    #[test]
    fn test_segmentation_replaces_prompts_with_candidates() {
        let session = segmented_session(vec![square(0.1, 0.1, 0.2), square(0.5, 0.5, 0.1)]);
        assert!(session.capture().prompts().is_empty());
        let candidates = session.candidates().unwrap();
        assert_eq!(candidates.id, "cand");
        assert_eq!(candidates.candidates.len(), 2);
        assert_eq!(candidates.candidates[0].score, Some(0.9));
    }

    #[test]
    fn test_failed_segmentation_keeps_prompts() {
        let mut session = ready_session();
        click(&mut session, 50.0, 50.0);
        let segmenter = ScriptedSegmenter::new(vec![Err(ServiceError::Unavailable(
            "timeout".into(),
        ))]);
        let err = block_on(session.segment_with(&segmenter)).unwrap_err();
        assert!(matches!(err, SessionError::Service { .. }));
        assert_eq!(session.capture().prompts().len(), 1);
        assert!(!session.is_loading(Operation::Segment));
    }

    #[test]
    fn test_response_after_image_change_is_stale() {
        let mut session = ready_session();
        click(&mut session, 50.0, 50.0);
        let request = session.begin_segmentation().unwrap();
        assert!(session.is_loading(Operation::Segment));
        assert!(matches!(
            session.begin_segmentation().map(|_| ()),
            Err(SessionError::OperationInProgress(Operation::Segment))
        ));

        session.set_image(Some(ImageInfo::new("next", 400, 300)));
        let response = SegmentationResponse {
            mask_id: None,
            contours: vec![square(0.1, 0.1, 0.2)],
            scores: Vec::new(),
        };
        let err = session
            .complete_segmentation(request.ticket, Ok(response))
            .unwrap_err();
        assert!(err.is_stale());
        assert!(session.candidates().is_none());
    }

    #[test]
    fn test_response_after_reset_is_stale() {
        let mut session = ready_session();
        click(&mut session, 50.0, 50.0);
        let request = session.begin_segmentation().unwrap();

        session.reset();
        let response = SegmentationResponse {
            mask_id: Some("late".into()),
            contours: vec![square(0.1, 0.1, 0.2)],
            scores: Vec::new(),
        };
        let err = session
            .complete_segmentation(request.ticket, Ok(response))
            .unwrap_err();
        assert!(matches!(err, SessionError::StaleResponse(Operation::Segment)));
        assert!(session.candidates().is_none());
        assert!(!session.is_loading(Operation::Segment));
    }

    #[test]
    fn test_selection_keeps_contour_visible_on_small_viewport() {
        let backend = MemoryMaskStore::new();
        let viewport = ImageSize::new(400, 300);
        let image = ImageSize::new(4000, 3000);
        let mut session = Session::default();
        session.set_viewports(viewport, viewport);
        session.set_image(Some(ImageInfo::new("large", 4000, 3000)));
        session.image_ready(CanvasKind::Drawing);
        session.image_ready(CanvasKind::FinalMask);

        let contour = Contour::from_record(square(0.1, 0.1, 0.5), image).unwrap();
        block_on(session.add_final_contours(&backend, vec![contour.clone()])).unwrap();
        session.select_final("contour-1").unwrap();

        for view in [session.capture().view(), session.final_scene().view] {
            for point in &contour.points {
                let screen = view.to_screen(*point);
                assert!(screen.x >= 0.0 && screen.x <= 400.0, "{:?}", screen);
                assert!(screen.y >= 0.0 && screen.y <= 300.0, "{:?}", screen);
            }
        }
    }

    #[test]
    fn test_unusable_zoom_limits_do_not_panic() {
        let mut config = CanvasConfig::default();
        config.zoom.drawing.max = 0.9;
        let mut session = Session::new(config);
        session.set_viewports(ImageSize::new(400, 300), ImageSize::new(400, 300));
        session.set_image(Some(ImageInfo::new("img", 400, 300)));

        let update = session.apply_zoom(1.0, Point::new(0.5, 0.5));
        assert_eq!(update.zoom.level, 0.9);
    }

    #[test]
    fn test_reject_hides_delete_removes() {
        let mut session = segmented_session(vec![
            square(0.1, 0.1, 0.2),
            square(0.5, 0.5, 0.1),
            square(0.7, 0.1, 0.1),
        ]);
        session.reject_candidate(0).unwrap();
        assert_eq!(session.candidates().unwrap().candidates.len(), 3);
        assert_eq!(session.drawing_scene().contours.len(), 2);

        session.delete_candidate(1).unwrap();
        assert_eq!(session.candidates().unwrap().candidates.len(), 2);
        assert!(session.delete_candidate(9).is_err());
    }

    #[test]
    fn test_delete_shifts_selection() {
        let mut session = segmented_session(vec![square(0.1, 0.1, 0.2), square(0.5, 0.5, 0.1)]);
        session.select_candidate(1).unwrap();
        session.delete_candidate(0).unwrap();
        assert_eq!(
            session.selection(),
            Some(&SelectionRef::Candidate {
                mask_id: "cand".into(),
                index: 0
            })
        );
        assert!(!session.zoom(CanvasKind::Drawing).is_reset());
    }

    #[test]
    fn test_accept_skips_rejected() {
        let backend = MemoryMaskStore::new();
        let mut session = segmented_session(vec![square(0.1, 0.1, 0.2), square(0.5, 0.5, 0.1)]);
        session.reject_candidate(1).unwrap();
        let total = block_on(session.accept_candidates(&backend, &[0, 1])).unwrap();
        assert_eq!(total, 1);
        let candidates = session.candidates().unwrap();
        assert_eq!(candidates.candidates[0].status, ReviewStatus::Accepted);
        assert_eq!(candidates.candidates[1].status, ReviewStatus::Rejected);
    }

    #[test]
    fn test_select_candidate_spotlights_and_zooms_drawing_view() {
        let mut session = segmented_session(vec![square(0.1, 0.1, 0.2), square(0.5, 0.5, 0.1)]);
        let update = session.select_candidate(1).unwrap();
        assert_eq!(session.capture().view().zoom, update.zoom.level);
        assert_eq!(session.zoom(CanvasKind::FinalMask), update.zoom);

        let scene = session.drawing_scene();
        assert_eq!(scene.spotlight, Some(1));
        assert!(scene.contours[1].selected);
    }

    #[test]
    fn test_rejected_candidate_not_selectable() {
        let mut session = segmented_session(vec![square(0.1, 0.1, 0.2)]);
        session.reject_candidate(0).unwrap();
        assert!(session.select_candidate(0).is_err());
    }

    #[test]
    fn test_reset_clears_prompts_selection_zoom() {
        let mut session = segmented_session(vec![square(0.1, 0.1, 0.2)]);
        session.select_candidate(0).unwrap();
        click(&mut session, 20.0, 20.0);
        session.reset();
        assert!(session.capture().prompts().is_empty());
        assert!(session.selection().is_none());
        assert!(session.zoom(CanvasKind::Drawing).is_reset());
        assert!(session.zoom(CanvasKind::FinalMask).is_reset());
    }

    #[test]
    fn test_frames_wait_for_image_ready() {
        let mut session = Session::default();
        session.set_viewports(ImageSize::new(100, 100), ImageSize::new(100, 100));
        session.set_image(Some(ImageInfo::new("img", 50, 50)));
        assert!(session.take_frame(CanvasKind::Drawing).is_none());

        assert!(session.image_ready(CanvasKind::Drawing));
        let frame = session.take_frame(CanvasKind::Drawing).unwrap();
        assert!(!frame.is_empty());
        assert!(session.take_frame(CanvasKind::Drawing).is_none());
    }

    #[test]
    fn test_final_selection_zooms_both_canvases() {
        let backend = MemoryMaskStore::new();
        let mut session = ready_session();
        let contours = vec![
            Contour::from_record(square(0.6, 0.6, 0.1), ImageSize::new(400, 300)).unwrap(),
        ];
        block_on(session.add_final_contours(&backend, contours)).unwrap();

        let update = session.select_final("contour-1").unwrap();
        assert!(update.immediate);
        assert_eq!(session.zoom(CanvasKind::Drawing), update.zoom);
        assert_eq!(session.final_scene().spotlight, Some(0));

        block_on(session.remove_final_contour(&backend, "contour-1")).unwrap();
        assert!(session.selection().is_none());
        assert!(session.zoom(CanvasKind::FinalMask).is_reset());
    }
}
