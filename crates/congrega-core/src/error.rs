//! Error types for commands and collaborators
//!
//! Store errors live with the stores (`store::StoreError`). Everything a
//! command handler can fail with is collected into [`CommandError`], which
//! knows the single generic notice shown to the user.

use thiserror::Error;

use crate::models::{EntityKind, RecordId};
use crate::store::StoreError;

/// Notice shown when an admin-only view is opened in the public role
pub const ACCESS_DENIED_NOTICE: &str = "Acesso restrito à administração.";

/// Errors from the sign-in collaborator
#[derive(Error, Debug)]
pub enum AuthError {
    /// Identifier or secret rejected
    #[error("Email ou senha inválidos.")]
    InvalidCredentials,

    /// The provider could not be reached or refused for another reason
    #[error("Autenticação indisponível: {0}")]
    Unavailable(String),
}

/// Errors from the welcome-message generator
///
/// Never shown to the user; callers substitute the fallback text.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Welcome message request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Welcome message response contained no text")]
    EmptyResponse,

    #[error("No API key configured for welcome messages")]
    MissingApiKey,
}

/// The kind of write a command performs, for user-facing notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Save,
    Update,
    Delete,
}

impl Operation {
    /// Generic failure notice for this operation
    pub fn failure_notice(self) -> &'static str {
        match self {
            Operation::Save => "Erro ao salvar",
            Operation::Update => "Erro ao atualizar",
            Operation::Delete => "Erro ao deletar",
        }
    }
}

/// Errors surfaced at the command-handler boundary
#[derive(Error, Debug)]
pub enum CommandError {
    /// The session role does not allow this command
    #[error("Not allowed in the current role: {action}")]
    Forbidden { action: String },

    /// The command referenced a record missing from the current snapshot
    #[error("No {kind} with id '{id}'")]
    NotFound { kind: EntityKind, id: RecordId },

    /// The store rejected or could not carry out the write
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Input failed validation before reaching the store
    #[error("{0}")]
    Invalid(String),

    /// Backups cannot be restored into this deployment
    #[error("A importação direta não está disponível na versão em nuvem por segurança. Contate o suporte técnico.")]
    ImportDisabled,

    /// The member was created but the visitor could not be removed
    #[error("Member {member_created} created but visitor removal failed: {source}")]
    PartialConversion {
        member_created: RecordId,
        #[source]
        source: StoreError,
    },

    /// The session was already shut down
    #[error("Session closed")]
    Closed,
}

impl CommandError {
    /// The message to show the user for a failed `operation`
    ///
    /// Store failures and missing records collapse into one generic notice.
    /// Validation and policy failures keep their own text.
    pub fn user_message(&self, operation: Operation) -> String {
        match self {
            CommandError::Forbidden { .. } => ACCESS_DENIED_NOTICE.to_string(),
            CommandError::Invalid(msg) => msg.clone(),
            CommandError::ImportDisabled => self.to_string(),
            CommandError::Store(StoreError::Unsupported(msg)) => msg.to_string(),
            CommandError::NotFound { .. }
            | CommandError::Store(_)
            | CommandError::PartialConversion { .. }
            | CommandError::Closed => operation.failure_notice().to_string(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        CommandError::Invalid(msg.into())
    }
}

pub type CommandResult<T> = Result<T, CommandError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_failures_use_generic_notice() {
        let err = CommandError::from(StoreError::rejected("members", "permission-denied"));
        assert_eq!(err.user_message(Operation::Save), "Erro ao salvar");
        assert_eq!(err.user_message(Operation::Update), "Erro ao atualizar");

        let err = CommandError::NotFound {
            kind: EntityKind::Visitors,
            id: RecordId::from("v1"),
        };
        assert_eq!(err.user_message(Operation::Delete), "Erro ao deletar");
    }

    #[test]
    fn test_partial_conversion_is_generic_failure() {
        let err = CommandError::PartialConversion {
            member_created: RecordId::from("m1"),
            source: StoreError::Connection("reset".to_string()),
        };
        assert_eq!(err.user_message(Operation::Save), "Erro ao salvar");
        assert!(err.to_string().contains("m1"));
    }

    #[test]
    fn test_validation_keeps_its_message() {
        let err = CommandError::invalid("O nome do visitante é obrigatório.");
        assert_eq!(
            err.user_message(Operation::Save),
            "O nome do visitante é obrigatório."
        );
    }

    #[test]
    fn test_forbidden_shows_access_notice() {
        let err = CommandError::Forbidden {
            action: "delete member".to_string(),
        };
        assert_eq!(err.user_message(Operation::Delete), ACCESS_DENIED_NOTICE);
    }

    #[test]
    fn test_unsupported_store_operation_explains_itself() {
        let err = CommandError::Store(StoreError::Unsupported("Reset is disabled."));
        assert_eq!(err.user_message(Operation::Delete), "Reset is disabled.");
    }
}
