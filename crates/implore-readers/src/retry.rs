//! Retry combinator
//!
//! Re-reads an upstream reader when it fails with an allow-listed error
//! class. Failures of any other class, and the last failure once the attempt
//! budget is spent, are returned unchanged.

use crate::config;
use crate::datatypes::DataType;
use crate::error::{ErrorClass, ReaderError, ReaderResult};
use crate::kwargs;
use crate::node::{Kwargs, Node};
use crate::readers::Reader;
use crate::value::Value;

/// Progress of one `read()` through a retry loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    NotStarted,
    /// Making attempt number `attempt` (1-based)
    Attempting { attempt: u32 },
    Succeeded,
    FailedFatal,
}

/// Result of driving the retry loop to a terminal state
#[derive(Debug)]
pub struct RetryOutcome {
    pub result: ReaderResult<Value>,
    /// Failed attempts during this read
    pub failures: u32,
    pub state: RetryState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Retry {
    upstream: Box<Reader>,
    allowed_exceptions: Vec<ErrorClass>,
    max_tries: u32,
}

impl Retry {
    /// Wrap a `ReaderData`; the budget comes from the installed config
    pub fn new(
        data: DataType,
        allowed_exceptions: impl IntoIterator<Item = ErrorClass>,
    ) -> ReaderResult<Self> {
        let upstream = match data {
            DataType::ReaderData(reader) => reader,
            other => {
                return Err(ReaderError::invalid_argument(
                    "retry",
                    format!("expected reader_data, got {}", other.name()),
                ))
            }
        };
        Ok(Self {
            upstream,
            allowed_exceptions: allowed_exceptions.into_iter().collect(),
            max_tries: config::current().retry_max_tries(),
        })
    }

    /// Set the total attempt budget (never below two)
    pub fn with_max_tries(mut self, max_tries: u32) -> Self {
        self.max_tries = max_tries.max(config::MIN_RETRY_TRIES);
        self
    }

    pub fn upstream(&self) -> &Reader {
        &self.upstream
    }

    pub fn data(&self) -> DataType {
        DataType::ReaderData(self.upstream.clone())
    }

    pub fn allowed_exceptions(&self) -> &[ErrorClass] {
        &self.allowed_exceptions
    }

    pub fn max_tries(&self) -> u32 {
        self.max_tries
    }

    pub fn into_reader(self) -> Reader {
        Reader::from(self)
    }

    fn allows(&self, error: &ReaderError) -> bool {
        let class = error.class();
        self.allowed_exceptions.iter().any(|a| a.covers(class))
    }

    /// Drive the loop for one read, reporting how it ended
    pub fn attempt(&self, limit: Option<usize>) -> RetryOutcome {
        let mut state = RetryState::NotStarted;
        let mut failures = 0;
        let mut last: Option<ReaderResult<Value>> = None;
        loop {
            state = match state {
                RetryState::NotStarted => RetryState::Attempting { attempt: 1 },
                RetryState::Attempting { attempt } => match self.upstream.execute(limit) {
                    Ok(value) => {
                        tracing::debug!(attempt, "retry succeeded");
                        last = Some(Ok(value));
                        RetryState::Succeeded
                    }
                    Err(error) => {
                        failures += 1;
                        if self.allows(&error) && attempt < self.max_tries {
                            tracing::warn!(
                                attempt,
                                max_tries = self.max_tries,
                                class = %error.class(),
                                %error,
                                "retrying after failure"
                            );
                            RetryState::Attempting {
                                attempt: attempt + 1,
                            }
                        } else {
                            tracing::debug!(attempt, class = %error.class(), "retry giving up");
                            last = Some(Err(error));
                            RetryState::FailedFatal
                        }
                    }
                },
                RetryState::Succeeded | RetryState::FailedFatal => {
                    let result = last.take().unwrap_or_else(|| {
                        Err(ReaderError::runtime("retry loop ended without a result"))
                    });
                    return RetryOutcome {
                        result,
                        failures,
                        state,
                    };
                }
            };
        }
    }

    pub(crate) fn run(&self, limit: Option<usize>) -> ReaderResult<Value> {
        self.attempt(limit).result
    }

    pub(crate) fn to_kwargs(&self) -> Kwargs {
        let allowed: Vec<Node> = self
            .allowed_exceptions
            .iter()
            .map(|c| Node::from(c.name()))
            .collect();
        kwargs! {
            "data" => self.data().to_node(),
            "allowed_exceptions" => allowed,
            "max_tries" => i64::from(self.max_tries),
        }
    }

    pub(crate) fn from_kwargs(kwargs: &Kwargs) -> ReaderResult<Self> {
        let data = kwargs
            .get("data")
            .ok_or_else(|| ReaderError::InvalidEntry("retry requires 'data'".to_string()))?;
        let allowed = match kwargs.get("allowed_exceptions") {
            None => vec![ErrorClass::Exception],
            Some(Node::Seq(items)) => items
                .iter()
                .map(|item| {
                    item.as_str()
                        .ok_or_else(|| {
                            ReaderError::InvalidEntry(format!("bad exception class {}", item))
                        })?
                        .parse()
                })
                .collect::<ReaderResult<Vec<ErrorClass>>>()?,
            Some(other) => {
                return Err(ReaderError::InvalidEntry(format!(
                    "allowed_exceptions must be a sequence, got {}",
                    other
                )))
            }
        };
        let mut retry = Retry::new(DataType::from_node(data)?, allowed)?;
        if let Some(node) = kwargs.get("max_tries") {
            let max_tries = node
                .as_int()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| ReaderError::InvalidEntry(format!("bad max_tries {}", node)))?;
            retry = retry.with_max_tries(max_tries);
        }
        Ok(retry)
    }
}
