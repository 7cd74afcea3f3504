use serde::Serialize;
use tracing::{debug, info, warn};

use crate::batch::{BatchKey, ScanHit};
use crate::capabilities::{
    decode_name, encode_name, name_key, CameraOutput, Capabilities, PREFLIGHT_FREE_CONTENT_TYPE,
};
use crate::event::Event;
use crate::gateway::{
    area_items_url, areas_url, decode_area_items, decode_areas, decode_form, decode_item,
    form_lookup_url, lookup_url, reply_from_http, GatewayReply,
};
use crate::image_processing::{downsize, ImageProcessingError};
use crate::mode::{switch_mode, Mode, SwitchOutcome, SwitchPlan};
use crate::model::{ActorRole, AreaCache, FormNumber, Model, NoticeKind, SalId};
use crate::scan::{
    classify, normalize_manual_form, normalize_manual_item, rejection_message, ScanClass,
};
use crate::session::{ScanSlot, SessionCommand};
use crate::submit::{
    build_bulk, build_single, build_upload, decode_confirmation, SingleInput, SubmitError, Surface,
};
use crate::view::ViewModel;
use crate::{AppError, AppResult, ErrorKind};

const FORM_IN_ITEM_MODE: &str = "That is a form QR. Switch to Upload to attach a signed copy.";
const ITEM_IN_UPLOAD_MODE: &str = "That is an item QR. Scan a dispatch or return form.";

fn selected_message(sal_id: &SalId) -> String {
    format!("{sal_id} selected")
}

fn camera_unavailable(reason: impl Into<String>) -> AppError {
    AppError::new(ErrorKind::CameraUnavailable, "Camera unavailable").with_internal(reason)
}

#[derive(Default)]
pub struct App;

impl App {
    fn send_commands(commands: Vec<SessionCommand>, caps: &Capabilities) {
        for command in commands {
            debug!(?command, "camera session command");
            caps.camera
                .session(command, |slot, output| Event::CameraStatus { slot, output });
        }
    }

    fn send_command(command: Option<SessionCommand>, caps: &Capabilities) {
        Self::send_commands(command.into_iter().collect(), caps);
    }

    fn apply_switch(plan: SwitchPlan, model: &mut Model, caps: &Capabilities) {
        model.clear_error();
        model.clear_notice();
        let slot = model.mode.slot();
        if model.sessions.is_unavailable(slot) {
            model.set_error(camera_unavailable(format!(
                "{} camera failed to start earlier",
                slot.as_str()
            )));
        }
        Self::send_commands(plan.commands, caps);
        if plan.fetch_areas {
            caps.http
                .get(areas_url(&model.endpoint))
                .send(|result| Event::AreasLoaded(reply_from_http(result)));
        }
        if let Some(key) = plan.reload {
            Self::fetch_area_items(key, model, caps);
        }
    }

    fn fetch_area_items(key: BatchKey, model: &Model, caps: &Capabilities) {
        caps.http
            .get(area_items_url(&model.endpoint, &key.area))
            .send(move |result| Event::AreaItemsLoaded {
                key,
                reply: reply_from_http(result),
            });
    }

    fn lookup_item(sal_id: SalId, model: &mut Model, caps: &Capabilities) {
        model.clear_error();
        model.clear_notice();
        model.single.begin_lookup(sal_id.clone());
        Self::send_item_lookup(sal_id, model, caps);
    }

    fn send_item_lookup(sal_id: SalId, model: &Model, caps: &Capabilities) {
        info!(%sal_id, "looking up item");
        caps.http
            .get(lookup_url(&model.endpoint, &sal_id))
            .send(move |result| Event::ItemLookedUp {
                requested: sal_id,
                reply: reply_from_http(result),
            });
    }

    fn lookup_form(form_no: FormNumber, model: &mut Model, caps: &Capabilities) {
        model.clear_error();
        model.clear_notice();
        model.upload.begin_lookup(form_no.clone());
        info!(%form_no, "looking up form");
        caps.http
            .get(form_lookup_url(&model.endpoint, &form_no))
            .send(move |result| Event::FormLookedUp {
                requested: form_no,
                reply: reply_from_http(result),
            });
    }

    /// POSTs `body` as JSON under a preflight-free content type.
    fn post<B, F>(
        body: &B,
        model: &Model,
        caps: &Capabilities,
        make_event: F,
    ) -> AppResult<()>
    where
        B: Serialize,
        F: FnOnce(GatewayReply) -> Event + Send + 'static,
    {
        let json = serde_json::to_string(body).map_err(|e| {
            AppError::new(ErrorKind::InvalidState, "Unable to prepare the request")
                .with_internal(e.to_string())
        })?;
        caps.http
            .post(model.endpoint.post_url())
            .header("Content-Type", PREFLIGHT_FREE_CONTENT_TYPE)
            .body_string(json)
            .send(move |result| make_event(reply_from_http(result)));
        Ok(())
    }

    fn persist_names(model: &Model, caps: &Capabilities) {
        for role in ActorRole::ALL {
            let name = model.actors.get(role).trim();
            if name.is_empty() {
                continue;
            }
            caps.kv
                .set(name_key(role).to_string(), encode_name(name), move |result| {
                    Event::NameSaved {
                        role,
                        result: result.map_err(|e| e.to_string()),
                    }
                });
        }
    }

    /// Item id from a scan or manual entry, routed by the active mode.
    fn accept_item(sal_id: SalId, model: &mut Model, caps: &Capabilities) {
        match model.mode {
            Mode::Single => {
                Self::send_command(model.sessions.pause(ScanSlot::Single), caps);
                Self::lookup_item(sal_id, model, caps);
            }
            Mode::Batch => match model.batch.register_scan(&sal_id) {
                ScanHit::Checked => {
                    model.show_notice(selected_message(&sal_id), NoticeKind::Success);
                }
                ScanHit::Duplicate => {
                    // The same code stays in frame for several decodes.
                    let just_selected = model.active_notice.as_ref().is_some_and(|notice| {
                        notice.kind == NoticeKind::Success
                            && notice.message == selected_message(&sal_id)
                    });
                    if !just_selected {
                        model.show_notice(
                            format!("{sal_id} is already selected"),
                            NoticeKind::Warning,
                        );
                    }
                }
                ScanHit::NotInList => {
                    model.show_notice(format!("{sal_id} is not in this list"), NoticeKind::Warning);
                }
            },
            Mode::Upload => model.show_notice(ITEM_IN_UPLOAD_MODE, NoticeKind::Warning),
        }
    }

    fn accept_form(form_no: FormNumber, model: &mut Model, caps: &Capabilities) {
        if model.mode == Mode::Upload {
            Self::send_command(model.sessions.pause(ScanSlot::Upload), caps);
            Self::lookup_form(form_no, model, caps);
        } else {
            model.show_notice(FORM_IN_ITEM_MODE, NoticeKind::Warning);
        }
    }

    fn handle_camera_status(
        slot: ScanSlot,
        output: CameraOutput,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        match output {
            CameraOutput::Scanning => Self::send_command(model.sessions.started(slot), caps),
            CameraOutput::HandleLost => Self::send_command(model.sessions.handle_lost(slot), caps),
            CameraOutput::Unavailable { reason } => {
                model.sessions.start_failed(slot);
                if slot == model.mode.slot() {
                    model.set_error(camera_unavailable(reason));
                }
            }
            CameraOutput::Photo { .. } | CameraOutput::Cancelled | CameraOutput::Done => {
                debug!(slot = slot.as_str(), ?output, "ignoring camera output");
            }
        }
    }

    fn handle_item_looked_up(
        requested: SalId,
        reply: GatewayReply,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if !model.single.is_awaiting(&requested) {
            debug!(%requested, "discarding stale item lookup");
            return;
        }
        match decode_item(reply) {
            Ok(item) => {
                let same_item = model
                    .single
                    .item
                    .as_ref()
                    .is_some_and(|current| current.sal_id == item.sal_id);
                if same_item {
                    model.single.refresh(item);
                } else {
                    model.single.show(item);
                }
            }
            Err(e) => {
                warn!(%requested, error = %e, "item lookup failed");
                model.set_error(e.into());
                model.single.clear();
                if model.mode == Mode::Single {
                    Self::send_commands(model.sessions.resume(ScanSlot::Single), caps);
                }
            }
        }
    }

    fn handle_form_looked_up(
        requested: FormNumber,
        reply: GatewayReply,
        model: &mut Model,
        caps: &Capabilities,
    ) {
        if !model.upload.is_awaiting(&requested) {
            debug!(%requested, "discarding stale form lookup");
            return;
        }
        match decode_form(reply) {
            Ok(form) => {
                if form.has_signed_copy {
                    model.show_notice(
                        "This form already has a signed copy on file",
                        NoticeKind::Warning,
                    );
                }
                model.upload.show(form);
                Self::send_command(model.sessions.stop(ScanSlot::Upload), caps);
            }
            Err(e) => {
                warn!(%requested, error = %e, "form lookup failed");
                model.set_error(e.into());
                model.upload.clear();
                if model.mode == Mode::Upload {
                    Self::send_commands(model.sessions.resume(ScanSlot::Upload), caps);
                }
            }
        }
    }

    fn submit_single(model: &mut Model, caps: &Capabilities) {
        if model.latch.is_busy(Surface::Single) {
            debug!("single submit already in flight");
            return;
        }
        let input = SingleInput {
            item: model.single.item.as_ref(),
            action: model.single.action,
            qty: model.single.qty,
            damaged_qty: model.single.damaged_qty,
            actors: &model.actors,
            notes: &model.single.notes,
        };
        let request = match build_single(&input) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "single submit rejected");
                model.set_error(e.into());
                return;
            }
        };

        Self::persist_names(model, caps);
        let sal_id = request.sal_id.clone();
        let sent = Self::post(&request, model, caps, move |reply| Event::SingleSubmitted {
            sal_id,
            reply,
        });
        match sent {
            Ok(()) => {
                model.latch.try_acquire(Surface::Single);
                model.clear_error();
                info!(sal_id = %request.sal_id, action = request.action.as_str(), "single submit sent");
            }
            Err(e) => model.set_error(e),
        }
    }

    fn submit_bulk(model: &mut Model, caps: &Capabilities) {
        if model.latch.is_busy(Surface::Bulk) {
            debug!("bulk submit already in flight");
            return;
        }
        let key = model.batch.key();
        let built = build_bulk(
            model.batch.action(),
            key.as_ref().map(|k| k.area.as_str()),
            &model.actors,
            &model.batch.notes,
            model.batch.lines(),
        );
        let (request, key) = match (built, key) {
            (Ok(request), Some(key)) => (request, key),
            (Ok(_), None) => {
                model.set_error(SubmitError::NoAreaSelected.into());
                return;
            }
            (Err(e), _) => {
                warn!(error = %e, "bulk submit rejected");
                model.set_error(e.into());
                return;
            }
        };

        Self::persist_names(model, caps);
        let lines = request.items.len();
        let sent = Self::post(&request, model, caps, move |reply| Event::BulkSubmitted {
            key,
            reply,
        });
        match sent {
            Ok(()) => {
                model.latch.try_acquire(Surface::Bulk);
                model.clear_error();
                info!(action = request.action, area = %request.area, lines, "bulk submit sent");
            }
            Err(e) => model.set_error(e),
        }
    }

    fn submit_signed_form(model: &mut Model, caps: &Capabilities) {
        if model.latch.is_busy(Surface::Upload) {
            debug!("signed form upload already in flight");
            return;
        }
        let pending = &model.upload.pending;
        let request = match build_upload(pending.form_no(), pending.photos(), model.upload.notify)
        {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "signed form upload rejected");
                model.set_error(e.into());
                return;
            }
        };

        let form_no = request.form_no.clone();
        let photos = request.images.len();
        let sent = Self::post(&request, model, caps, move |reply| Event::SignedFormSubmitted {
            form_no,
            reply,
        });
        match sent {
            Ok(()) => {
                model.latch.try_acquire(Surface::Upload);
                model.clear_error();
                info!(form_no = %request.form_no, photos, "signed form upload sent");
            }
            Err(e) => model.set_error(e),
        }
    }

    fn add_photo(form_no: &FormNumber, data: &[u8], model: &mut Model) {
        if model.upload.pending.form_no() != Some(form_no) {
            debug!(%form_no, "discarding photo for a form no longer shown");
            return;
        }
        let max = model.config.photo.max_photos;
        let added = downsize(data, &model.config.photo)
            .and_then(|photo| model.upload.pending.push(photo, max));
        match added {
            Ok(()) => model.clear_error(),
            Err(e) => {
                warn!(error = %e, "photo rejected");
                model.set_error(e.into());
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        debug!(event = event.name(), mode = model.mode.as_str(), "update");

        match event {
            Event::AppStarted => {
                for role in ActorRole::ALL {
                    caps.kv.get(name_key(role).to_string(), move |result| {
                        Event::NameRestored {
                            role,
                            stored: result.map_err(|e| e.to_string()),
                        }
                    });
                }
                let slot = model.mode.slot();
                Self::send_commands(
                    model.sessions.activate(slot, model.mode == Mode::Upload),
                    caps,
                );
                if model.mode == Mode::Batch && model.areas == AreaCache::NotLoaded {
                    model.areas = AreaCache::Loading;
                    caps.http
                        .get(areas_url(&model.endpoint))
                        .send(|result| Event::AreasLoaded(reply_from_http(result)));
                }
            }

            Event::Configure(config) => match config.endpoint() {
                Ok(endpoint) => {
                    info!(api_url = endpoint.as_str(), "configuration applied");
                    model.endpoint = endpoint;
                    model.config = config;
                }
                Err(e) => {
                    warn!(error = %e, "configuration rejected");
                    model.set_error(e.into());
                }
            },

            Event::NameRestored { role, stored } => match stored {
                Ok(Some(bytes)) => match decode_name(role, &bytes) {
                    Ok(Some(name)) if model.actors.get(role).is_empty() => {
                        model.actors.set(role, name);
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "ignoring stored name"),
                },
                Ok(None) => {}
                Err(e) => warn!(?role, error = %e, "name restore failed"),
            },

            Event::NameSaved { role, result } => {
                if let Err(e) = result {
                    warn!(?role, error = %e, "name save failed");
                    model.set_error(
                        AppError::new(ErrorKind::Storage, "write failed").with_internal(e),
                    );
                }
            }

            Event::SwitchMode(target) => match switch_mode(model, target, false) {
                SwitchOutcome::Switched(plan) => Self::apply_switch(plan, model, caps),
                SwitchOutcome::NeedsConfirmation => {
                    let count = model.upload.pending.len();
                    model.show_notice(
                        format!("Switching modes will discard {count} captured photo(s)."),
                        NoticeKind::Warning,
                    );
                }
                SwitchOutcome::Unchanged => {}
            },

            Event::ConfirmModeSwitch => {
                if let Some(target) = model.pending_switch {
                    if let SwitchOutcome::Switched(plan) = switch_mode(model, target, true) {
                        Self::apply_switch(plan, model, caps);
                    }
                }
            }

            Event::CancelModeSwitch => {
                model.pending_switch = None;
                model.clear_notice();
            }

            Event::CameraStatus { slot, output } => {
                Self::handle_camera_status(slot, output, model, caps);
            }

            Event::RetryCamera(slot) => {
                if slot == model.mode.slot() {
                    model.clear_error();
                    Self::send_commands(model.sessions.retry(slot), caps);
                }
            }

            Event::CodeDecoded { slot, text } => {
                if slot != model.mode.slot() || !model.sessions.accepts_decodes(slot) {
                    debug!(slot = slot.as_str(), "ignoring decode for inactive slot");
                    return;
                }
                match classify(&text) {
                    ScanClass::Item(sal_id) => Self::accept_item(sal_id, model, caps),
                    ScanClass::Form(form_no) => Self::accept_form(form_no, model, caps),
                    ScanClass::Invalid(raw) => {
                        debug!(%raw, "rejected scan");
                        model.show_notice(rejection_message(&raw), NoticeKind::Error);
                    }
                }
            }

            Event::ManualItemEntered(input) => match normalize_manual_item(&input) {
                Ok(sal_id) => Self::accept_item(sal_id, model, caps),
                Err(e) => model.set_error(e.into()),
            },

            Event::ManualFormEntered(input) => match normalize_manual_form(&input) {
                Ok(form_no) => Self::accept_form(form_no, model, caps),
                Err(e) => model.set_error(e.into()),
            },

            Event::ItemLookedUp { requested, reply } => {
                Self::handle_item_looked_up(requested, reply, model, caps);
            }

            Event::SingleActionSelected(action) => model.single.select_action(action),
            Event::SingleQtyChanged(qty) => model.single.qty = qty,
            Event::SingleDamagedChanged(damaged) => model.single.damaged_qty = damaged,
            Event::SingleNotesChanged(notes) => model.single.notes = notes,

            Event::ActorNameChanged { role, name } => model.actors.set(role, name),

            Event::SubmitSingle => Self::submit_single(model, caps),

            Event::SingleSubmitted { sal_id, reply } => {
                model.latch.release(Surface::Single);
                match decode_confirmation(reply) {
                    Ok(confirmation) => {
                        info!(%sal_id, form = ?confirmation.form_number, "single submit confirmed");
                        model.show_notice(confirmation.summary(), NoticeKind::Success);
                        model.confirmation = Some(confirmation);
                        let showing = model
                            .single
                            .item
                            .as_ref()
                            .is_some_and(|item| item.sal_id == sal_id);
                        if showing {
                            model.single.requested = Some(sal_id.clone());
                            Self::send_item_lookup(sal_id, model, caps);
                        }
                    }
                    Err(e) => {
                        warn!(%sal_id, error = %e, "single submit failed");
                        model.set_error(e.into());
                    }
                }
            }

            Event::ResetSingle => {
                model.single.clear();
                model.clear_error();
                model.clear_notice();
                if model.mode == Mode::Single {
                    Self::send_commands(model.sessions.resume(ScanSlot::Single), caps);
                }
            }

            Event::AreasLoaded(reply) => match decode_areas(reply) {
                Ok(areas) => {
                    info!(count = areas.len(), "areas loaded");
                    model.areas = AreaCache::Loaded(areas);
                }
                Err(e) => {
                    warn!(error = %e, "area list failed");
                    model.areas = AreaCache::NotLoaded;
                    model.set_error(e.into());
                }
            },

            Event::AreaSelected(area) => {
                if let Some(key) = model.batch.set_area(area) {
                    Self::fetch_area_items(key, model, caps);
                }
            }

            Event::BatchActionSelected(action) => {
                if let Some(key) = model.batch.set_action(action) {
                    Self::fetch_area_items(key, model, caps);
                }
            }

            Event::AreaItemsLoaded { key, reply } => match decode_area_items(reply) {
                Ok(items) => {
                    model.batch.apply_snapshot(&key, items);
                }
                Err(e) => {
                    if model.batch.load_failed(&key) {
                        warn!(area = %key.area, error = %e, "area items failed");
                        model.set_error(e.into());
                    }
                }
            },

            Event::LineChecked { sal_id, checked } => model.batch.set_checked(&sal_id, checked),
            Event::LineQtyChanged { sal_id, qty } => model.batch.set_qty(&sal_id, qty),
            Event::LineDamagedChanged {
                sal_id,
                damaged_qty,
            } => model.batch.set_damaged(&sal_id, damaged_qty),
            Event::SelectAll(checked) => model.batch.select_all(checked),
            Event::BatchNotesChanged(notes) => model.batch.notes = notes,

            Event::SubmitBulk => Self::submit_bulk(model, caps),

            Event::BulkSubmitted { key, reply } => {
                model.latch.release(Surface::Bulk);
                match decode_confirmation(reply) {
                    Ok(confirmation) => {
                        info!(area = %key.area, form = ?confirmation.form_number, "bulk submit confirmed");
                        model.show_notice(confirmation.summary(), NoticeKind::Success);
                        model.confirmation = Some(confirmation);
                        model.batch.notes.clear();
                        if model.mode == Mode::Batch {
                            if let Some(key) = model.batch.begin_reload() {
                                Self::fetch_area_items(key, model, caps);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(area = %key.area, error = %e, "bulk submit failed");
                        model.set_error(e.into());
                    }
                }
            }

            Event::FormLookedUp { requested, reply } => {
                Self::handle_form_looked_up(requested, reply, model, caps);
            }

            Event::CapturePhotoRequested => {
                let max = model.config.photo.max_photos;
                match model.upload.pending.form_no().cloned() {
                    None => model.set_error(SubmitError::NoCurrentForm.into()),
                    Some(_) if model.upload.pending.len() >= max => {
                        model.set_error(ImageProcessingError::LimitReached { max }.into());
                    }
                    Some(form_no) => caps
                        .camera
                        .capture_photo(move |output| Event::PhotoCaptured { form_no, output }),
                }
            }

            Event::PhotoCaptured { form_no, output } => match output {
                CameraOutput::Photo { data } => Self::add_photo(&form_no, &data, model),
                CameraOutput::Unavailable { reason } => {
                    model.set_error(camera_unavailable(reason));
                }
                other => debug!(?other, "photo capture ended without a photo"),
            },

            Event::RemovePhoto(index) => {
                model.upload.pending.remove(index);
            }

            Event::NotifyToggled(notify) => model.upload.notify = notify,

            Event::SubmitSignedForm => Self::submit_signed_form(model, caps),

            Event::SignedFormSubmitted { form_no, reply } => {
                model.latch.release(Surface::Upload);
                match decode_confirmation(reply) {
                    Ok(confirmation) => {
                        info!(%form_no, "signed form uploaded");
                        model.show_notice(confirmation.summary(), NoticeKind::Success);
                        model.confirmation = Some(confirmation);
                        if model.upload.pending.form_no() == Some(&form_no) {
                            model.upload.clear();
                            if model.mode == Mode::Upload {
                                Self::send_commands(
                                    model.sessions.activate(ScanSlot::Upload, true),
                                    caps,
                                );
                            }
                        }
                    }
                    Err(e) => {
                        warn!(%form_no, error = %e, "signed form upload failed");
                        model.set_error(e.into());
                    }
                }
            }

            Event::DismissNotice => {
                model.clear_error();
                model.clear_notice();
            }

            Event::DismissConfirmation => model.confirmation = None,
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        ViewModel::from_model(model)
    }
}
