use err_derive::Error;
use std::fmt::Debug;

/// Errors raised while preparing a judging session: loading configuration
/// and problems. Judging itself never fails with this type; its failures are
/// folded into [`crate::tester::model::ExecutionOutcome`].
#[derive(Debug, Error)]
pub enum JudgerErr {
    #[error(display = "No such problem: {}", _0)]
    NoSuchProblem(String),

    #[error(display = "Problem {} has no template for {}", _0, _1)]
    NoTemplate(String, crate::catalog::Language),

    #[error(display = "Invalid config: {}", _0)]
    InvalidConfig(String),

    #[error(display = "IO error: {}", _0)]
    Io(#[error(source)] std::io::Error),

    #[error(display = "JSON error: {}", _0)]
    Json(#[error(source)] serde_json::Error),

    #[error(display = "TOML deserialization error: {}", _0)]
    TomlDes(#[error(source)] toml::de::Error),

    #[error(display = "{:#}", _0)]
    Any(anyhow::Error),
}

macro_rules! anyhow_downcast_chain {
    ($e:expr, $($ty:ty),*) => {
        $(if $e.is::<$ty>(){
            if let Ok(e) = $e.downcast::<$ty>() {
                return e.into();
            }
            unreachable!()
        })*
    };
}

impl From<anyhow::Error> for JudgerErr {
    fn from(e: anyhow::Error) -> Self {
        if e.chain().count() > 1 {
            tracing::warn!(
                "Context may be stripped during downcast. Logging error here:\n{:#}",
                e
            );
        }
        anyhow_downcast_chain!(e, std::io::Error, serde_json::Error, toml::de::Error);
        JudgerErr::Any(e)
    }
}
