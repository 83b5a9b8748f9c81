use crate::model::Status;

/// What the tracker must do so an issue reflects the source status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Close,
    SetStatus(&'static str),
}

/// `None` means the freshly created issue already has the right status.
pub fn status_action(status: Status) -> Option<StatusAction> {
    match status {
        Status::Done | Status::Cancelled => Some(StatusAction::Close),
        Status::InProgress => Some(StatusAction::SetStatus("in_progress")),
        Status::Deferred => Some(StatusAction::SetStatus("deferred")),
        Status::Blocked => Some(StatusAction::SetStatus("blocked")),
        Status::Pending => None,
    }
}
