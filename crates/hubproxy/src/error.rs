//! # Error Definitions
//!
//! Everything that can go wrong while building a proxy. All of these are
//! contract-definition errors: they surface at construction time, before the
//! transport sees a single call. Runtime call failures are
//! [`transport::Error`](crate::transport::Error) and never pass through here.

/// Proxy construction failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The target is not a pure capability declaration.
    InvalidContractKind { contract: String },
    /// A member's declared type matches none of the four shapes.
    UnsupportedMemberShape { member: String, found: String },
    /// A member takes more arguments than the transport can carry.
    UnsupportedArity { member: String, arity: usize, max: usize },
    /// A second member resolved to a wire name already taken.
    DuplicateWireName { member: String, wire_name: String, first: String },
    /// The typed proxy expected a bound member the table does not hold.
    MissingMember { member: String, expected: &'static str },
    /// The table holds bound members the typed proxy never claimed.
    UnclaimedMember { members: Vec<String> },
    /// The table handed to a typed proxy was assembled from another contract.
    ContractMismatch { expected: String, found: String },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidContractKind { contract } => {
                write!(f, "'{}' is not a contract: proxies can only be generated for traits", contract)
            }
            Self::UnsupportedMemberShape { member, found } => write!(
                f,
                "member '{}' has unsupported shape '{}': expected Completion, Pending<T>, Subscription or Observable<T>",
                member, found
            ),
            Self::UnsupportedArity { member, arity, max } => write!(
                f,
                "member '{}' takes {} parameters; the transport supports at most {}",
                member, arity, max
            ),
            Self::DuplicateWireName { member, wire_name, first } => write!(
                f,
                "member '{}' resolves to wire name '{}' already used by '{}': overloading is not supported",
                member, wire_name, first
            ),
            Self::MissingMember { member, expected } => {
                write!(f, "no bound {} named '{}'", expected, member)
            }
            Self::UnclaimedMember { members } => {
                write!(f, "bound members not claimed by the proxy: {}", members.join(", "))
            }
            Self::ContractMismatch { expected, found } => write!(
                f,
                "member table was assembled from '{}' but the proxy implements '{}'",
                found, expected
            ),
        }
    }
}

impl std::error::Error for Error {}

pub type Result<T> = std::result::Result<T, Error>;
