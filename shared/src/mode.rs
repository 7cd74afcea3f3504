//! Top-level mode state machine.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::batch::BatchKey;
use crate::model::{AreaCache, Model};
use crate::session::{ScanSlot, SessionCommand};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    #[default]
    Single,
    Batch,
    Upload,
}

impl Mode {
    #[must_use]
    pub const fn slot(self) -> ScanSlot {
        match self {
            Self::Single => ScanSlot::Single,
            Self::Batch => ScanSlot::Batch,
            Self::Upload => ScanSlot::Upload,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Batch => "batch",
            Self::Upload => "upload",
        }
    }
}

/// Side effects a completed switch asks the app to perform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SwitchPlan {
    pub commands: Vec<SessionCommand>,
    pub fetch_areas: bool,
    pub reload: Option<BatchKey>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchOutcome {
    /// Already in the target mode.
    Unchanged,
    /// Uncommitted photos would be lost; the switch is parked in
    /// `Model::pending_switch` until confirmed or cancelled.
    NeedsConfirmation,
    Switched(SwitchPlan),
}

/// Moves the model to `target`. Leaving upload mode with captured photos
/// requires `confirmed`.
pub fn switch_mode(model: &mut Model, target: Mode, confirmed: bool) -> SwitchOutcome {
    if model.mode == target {
        model.pending_switch = None;
        return SwitchOutcome::Unchanged;
    }

    if model.mode == Mode::Upload && !model.upload.pending.is_empty() && !confirmed {
        model.pending_switch = Some(target);
        return SwitchOutcome::NeedsConfirmation;
    }
    model.pending_switch = None;

    let from = model.mode;
    model.single.clear();
    model.upload.clear();
    if from == Mode::Batch {
        model.batch.clear();
    }

    let mut plan = SwitchPlan {
        commands: model.sessions.activate(target.slot(), target == Mode::Upload),
        ..SwitchPlan::default()
    };

    if target == Mode::Batch {
        if model.areas == AreaCache::NotLoaded {
            model.areas = AreaCache::Loading;
            plan.fetch_areas = true;
        }
        plan.reload = model.batch.begin_reload();
    }

    model.mode = target;
    info!(from = from.as_str(), to = target.as_str(), ?plan, "mode switched");
    SwitchOutcome::Switched(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_processing::EncodedPhoto;
    use crate::model::{FormNumber, SalId};
    use crate::session::SessionState;

    fn photo() -> EncodedPhoto {
        EncodedPhoto {
            data_url: "data:image/jpeg;base64,AA".into(),
            width: 1,
            height: 1,
            byte_len: 1,
        }
    }

    fn plan(outcome: SwitchOutcome) -> SwitchPlan {
        match outcome {
            SwitchOutcome::Switched(plan) => plan,
            other => panic!("expected a switch, got {other:?}"),
        }
    }

    #[test]
    fn single_to_batch_stops_single_and_fetches_areas_once() {
        let mut model = Model::default();
        model.sessions.activate(ScanSlot::Single, false);
        model.sessions.started(ScanSlot::Single);
        model.single.begin_lookup(SalId::new("SAL-001"));

        let first = plan(switch_mode(&mut model, Mode::Batch, false));
        assert_eq!(
            first.commands,
            vec![
                SessionCommand::Stop(ScanSlot::Single),
                SessionCommand::Start(ScanSlot::Batch)
            ]
        );
        assert!(first.fetch_areas);
        assert_eq!(first.reload, None);
        assert_eq!(model.single.requested, None);
        assert_eq!(model.sessions.state(ScanSlot::Single), SessionState::Closed);

        model.areas = AreaCache::Loaded(vec!["Lighting".into()]);
        model.sessions.started(ScanSlot::Batch);
        plan(switch_mode(&mut model, Mode::Single, false));
        let again = plan(switch_mode(&mut model, Mode::Batch, false));
        assert!(!again.fetch_areas);
    }

    #[test]
    fn returning_to_single_resumes_warm_slot() {
        let mut model = Model::default();
        model.sessions.activate(ScanSlot::Single, false);
        model.sessions.started(ScanSlot::Single);
        plan(switch_mode(&mut model, Mode::Batch, false));
        model.sessions.started(ScanSlot::Batch);

        let back = plan(switch_mode(&mut model, Mode::Single, false));
        assert_eq!(
            back.commands,
            vec![
                SessionCommand::Stop(ScanSlot::Batch),
                SessionCommand::Resume(ScanSlot::Single)
            ]
        );
    }

    #[test]
    fn upload_always_starts_fresh() {
        let mut model = Model {
            mode: Mode::Upload,
            ..Model::default()
        };
        model.sessions.activate(ScanSlot::Upload, true);
        model.sessions.started(ScanSlot::Upload);
        plan(switch_mode(&mut model, Mode::Single, false));
        model.sessions.started(ScanSlot::Single);

        let to_upload = plan(switch_mode(&mut model, Mode::Upload, false));
        assert_eq!(
            to_upload.commands,
            vec![
                SessionCommand::Stop(ScanSlot::Single),
                SessionCommand::Start(ScanSlot::Upload)
            ]
        );
    }

    #[test]
    fn leaving_upload_with_photos_needs_confirmation() {
        let mut model = Model {
            mode: Mode::Upload,
            ..Model::default()
        };
        model.upload.pending.attach(FormNumber::new("DF-0001"));
        model.upload.pending.push(photo(), 10).unwrap();

        assert_eq!(
            switch_mode(&mut model, Mode::Single, false),
            SwitchOutcome::NeedsConfirmation
        );
        assert_eq!(model.mode, Mode::Upload);
        assert_eq!(model.pending_switch, Some(Mode::Single));
        assert_eq!(model.upload.pending.len(), 1);

        plan(switch_mode(&mut model, Mode::Single, true));
        assert_eq!(model.mode, Mode::Single);
        assert_eq!(model.pending_switch, None);
        assert!(model.upload.pending.is_empty());
    }

    #[test]
    fn reentering_batch_reloads_selected_area() {
        let mut model = Model::default();
        model.areas = AreaCache::Loaded(vec!["Lighting".into()]);
        plan(switch_mode(&mut model, Mode::Batch, false));
        model.batch.set_area(Some("Lighting".into()));

        plan(switch_mode(&mut model, Mode::Single, false));
        let back = plan(switch_mode(&mut model, Mode::Batch, false));
        assert_eq!(back.reload.map(|key| key.area), Some("Lighting".to_string()));
        assert!(model.batch.is_loading());
    }

    #[test]
    fn same_mode_is_a_no_op() {
        let mut model = Model::default();
        assert_eq!(
            switch_mode(&mut model, Mode::Single, false),
            SwitchOutcome::Unchanged
        );
    }
}
