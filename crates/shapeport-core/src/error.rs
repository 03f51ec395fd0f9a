use crate::Status;

pub type Result<T, E = ShapeError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("partial shape pointer is null")]
    NullPointer,

    #[error("malformed dimension record{}: {reason}", axis_suffix(.axis))]
    MalformedRecord { axis: Option<usize>, reason: String },

    #[error("foreign allocation for partial shape failed")]
    AllocationFailure,

    #[error("shape has dynamic dimensions and cannot be made static")]
    HasDynamicDimensions,

    #[error("partial shape was used after its foreign block was released")]
    UseAfterFree,

    #[error("invalid dimension [{min:?}, {max:?}]: {reason}")]
    InvalidDimension {
        min: Option<u64>,
        max: Option<u64>,
        reason: &'static str,
    },

    #[error("static rank {rank} does not match {len} dimensions")]
    RankMismatch { rank: u64, len: usize },

    #[error("rank is dynamic, dimensions are not indexable")]
    DynamicRank,

    #[error("axis {axis} out of range for rank {rank}")]
    AxisOutOfRange { axis: usize, rank: usize },

    #[error("cannot parse `{input}`: {reason}")]
    Parse { input: String, reason: String },

    #[error("engine reported {status:?}")]
    Engine { status: Status },
}

fn axis_suffix(axis: &Option<usize>) -> String {
    axis.map(|a| format!(" at axis {a}")).unwrap_or_default()
}

impl ShapeError {
    pub(crate) fn malformed(axis: Option<usize>, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            axis,
            reason: reason.into(),
        }
    }

    /// Attaches the axis a malformed record was read from.
    pub(crate) fn at_axis(self, axis: usize) -> Self {
        match self {
            Self::MalformedRecord { axis: None, reason } => Self::MalformedRecord {
                axis: Some(axis),
                reason,
            },
            other => other,
        }
    }

    pub(crate) fn parse(input: &str, reason: impl Into<String>) -> Self {
        Self::Parse {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}
