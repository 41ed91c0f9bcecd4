//! Confirmation of destructive commands
//!
//! Destructive commands are first turned into a [`ConfirmationRequest`].
//! The view layer shows its prompt and resolves it with a [`Decision`];
//! only an accepted request yields the action to run.

use crate::backup::Backup;
use crate::models::{EntityKind, RecordId};

/// A destructive command waiting for confirmation
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    Delete { kind: EntityKind, id: RecordId },
    ConvertVisitor { id: RecordId },
    /// Replace all data with a decoded backup
    Import(Box<Backup>),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Cancel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmationRequest {
    action: PendingAction,
    prompt: String,
}

impl ConfirmationRequest {
    pub fn new(action: PendingAction) -> Self {
        let prompt = prompt_for(&action).to_string();
        Self { action, prompt }
    }

    pub fn action(&self) -> &PendingAction {
        &self.action
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// The action to run, if accepted
    pub fn resolve(self, decision: Decision) -> Option<PendingAction> {
        match decision {
            Decision::Accept => Some(self.action),
            Decision::Cancel => None,
        }
    }
}

fn prompt_for(action: &PendingAction) -> &'static str {
    match action {
        PendingAction::Delete { kind, .. } => match kind {
            EntityKind::Members => "Tem certeza que deseja excluir este membro?",
            EntityKind::Visitors => "Tem certeza que deseja excluir este visitante?",
            EntityKind::Events => {
                "Tem certeza que deseja excluir este evento? Esta ação não pode ser desfeita."
            }
            EntityKind::PrayerRequests => {
                "Tem certeza que deseja excluir este pedido de oração? Esta ação não pode ser desfeita."
            }
            EntityKind::Program => "Tem certeza que deseja apagar a programação?",
        },
        PendingAction::ConvertVisitor { .. } => {
            "Tem certeza que deseja converter este visitante em membro? Esta ação removerá o registro de visitante."
        }
        PendingAction::Import(_) => "Isso substituirá todos os dados atuais. Deseja continuar?",
        PendingAction::Reset => {
            "Tem certeza que deseja apagar TODOS os dados? Esta ação não pode ser desfeita."
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_yields_action() {
        let request = ConfirmationRequest::new(PendingAction::Delete {
            kind: EntityKind::Members,
            id: RecordId::from("m1"),
        });
        assert_eq!(request.prompt(), "Tem certeza que deseja excluir este membro?");

        let action = request.resolve(Decision::Accept);
        assert_eq!(
            action,
            Some(PendingAction::Delete {
                kind: EntityKind::Members,
                id: RecordId::from("m1"),
            })
        );
    }

    #[test]
    fn test_cancel_yields_nothing() {
        let request = ConfirmationRequest::new(PendingAction::ConvertVisitor {
            id: RecordId::from("v1"),
        });
        assert!(request.prompt().contains("converter"));
        assert!(request.resolve(Decision::Cancel).is_none());
    }
}
