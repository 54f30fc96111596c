//! Error taxonomy for operator commands.
//!
//! Every failure a command handler can hit is classified into one of these
//! variants. The top-level handler in `main` prints a single colored line per
//! error and exits non-zero; nothing here is retried.

use std::fmt;
use std::io;

/// Classified failure from a command handler.
#[derive(Debug)]
pub enum OpsError {
    /// Provider credentials are absent or the login session expired.
    /// Carries a remediation hint ("run `aws configure`").
    CredentialsMissing { provider: &'static str, hint: &'static str },

    /// The resource id does not exist or the caller cannot see it.
    NotFound { kind: &'static str, id: String },

    /// Credentials exist but lack the required scope.
    PermissionDenied { detail: String },

    /// The resource is already in the requested state (stop on a stopped
    /// instance, delete of an absent database). Soft outcome; handlers
    /// usually print a no-op note instead of propagating this.
    AlreadyInState { detail: String },

    /// The user's numbered selection was out of range or malformed.
    InvalidSelection { input: String, max: usize },

    /// The user declined a confirmation prompt. Not a failure of the tool;
    /// still exits non-zero so scripts can distinguish it.
    ConfirmationDeclined,

    /// Local filesystem failure (report directory, dump staging, backups).
    LocalIo { context: String, source: io::Error },

    /// A wrapped CLI tool exited non-zero for a reason that does not map to
    /// a more specific variant.
    Subprocess { program: String, detail: String },

    /// Any other provider-side failure (network, throttling, malformed
    /// response). Deliberately not subdivided: the corpus never retries.
    Provider { detail: String },
}

impl OpsError {
    /// Classify raw stderr from a provider CLI into the taxonomy.
    ///
    /// The AWS and Azure CLIs signal well-known failures with stable phrases
    /// in their error text; anything unrecognized lands in [`Provider`].
    ///
    /// [`Provider`]: OpsError::Provider
    #[must_use]
    pub fn classify_cli(program: &str, kind: &'static str, id: &str, stderr: &str) -> Self {
        let lower = stderr.to_ascii_lowercase();

        if lower.contains("notfound")
            || lower.contains("not found")
            || lower.contains("does not exist")
            || lower.contains("resourcenotfound")
        {
            return Self::NotFound { kind, id: id.to_string() };
        }

        if lower.contains("accessdenied")
            || lower.contains("access denied")
            || lower.contains("unauthorizedoperation")
            || lower.contains("authorizationfailed")
            || lower.contains("forbidden")
        {
            return Self::PermissionDenied { detail: first_line(stderr) };
        }

        if lower.contains("incorrectinstancestate")
            || lower.contains("incorrectstate")
            || lower.contains("is not in a state")
            || lower.contains("already")
        {
            return Self::AlreadyInState { detail: first_line(stderr) };
        }

        if lower.contains("unable to locate credentials")
            || lower.contains("expiredtoken")
            || lower.contains("please run 'az login'")
            || lower.contains("az login")
        {
            let (provider, hint) = if program.starts_with("az") {
                ("azure", "run `az login`")
            } else {
                ("aws", "run `aws configure` or set AWS environment variables")
            };
            return Self::CredentialsMissing { provider, hint };
        }

        Self::Subprocess { program: program.to_string(), detail: first_line(stderr) }
    }

    /// True for outcomes caused by the operator (cancel, bad selection)
    /// rather than the provider or the environment.
    #[must_use]
    pub const fn is_user_abort(&self) -> bool {
        matches!(self, Self::ConfirmationDeclined | Self::InvalidSelection { .. })
    }
}

fn first_line(text: &str) -> String {
    text.lines().find(|l| !l.trim().is_empty()).unwrap_or("").trim().to_string()
}

impl fmt::Display for OpsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CredentialsMissing { provider, hint } => {
                write!(f, "{provider} credentials not configured ({hint})")
            }
            Self::NotFound { kind, id } => write!(f, "{kind} '{id}' not found"),
            Self::PermissionDenied { detail } => write!(f, "permission denied: {detail}"),
            Self::AlreadyInState { detail } => write!(f, "no change needed: {detail}"),
            Self::InvalidSelection { input, max } => {
                write!(f, "invalid selection '{input}' (expected 1-{max})")
            }
            Self::ConfirmationDeclined => write!(f, "operation cancelled"),
            Self::LocalIo { context, source } => write!(f, "{context}: {source}"),
            Self::Subprocess { program, detail } => write!(f, "{program} failed: {detail}"),
            Self::Provider { detail } => write!(f, "provider error: {detail}"),
        }
    }
}

impl std::error::Error for OpsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::LocalIo { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<io::Error> for OpsError {
    fn from(source: io::Error) -> Self {
        Self::LocalIo { context: "I/O error".to_string(), source }
    }
}

/// Shorthand used throughout the command handlers.
pub type OpsResult<T> = Result<T, OpsError>;
