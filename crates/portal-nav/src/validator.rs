//! Node validators.
//!
//! A validator answers one yes/no question about a node for a requester. The
//! navigation tree holds three chains, each a [`CompositeValidator`]:
//!
//! - access: may the requester open the node
//! - listing: should the node appear among its parent's children
//! - security: does the requester have read rights on the node

use std::sync::Arc;

use crate::collab::SecurityOracle;
use crate::context::RequestContext;
use crate::node::NavNode;

/// Yes/no check on a node.
pub trait NodeValidator: Send + Sync {
    /// Whether `node` passes for the requester.
    fn validate(&self, ctx: &RequestContext, node: &NavNode) -> bool;
}

/// Accepts every node.
pub struct AlwaysTrue;

impl NodeValidator for AlwaysTrue {
    fn validate(&self, _ctx: &RequestContext, _node: &NavNode) -> bool {
        true
    }
}

/// Rejects every node.
pub struct AlwaysFalse;

impl NodeValidator for AlwaysFalse {
    fn validate(&self, _ctx: &RequestContext, _node: &NavNode) -> bool {
        false
    }
}

/// Delegates to the security oracle for the node's record.
pub struct SecurityValidator {
    oracle: Arc<dyn SecurityOracle>,
}

impl SecurityValidator {
    /// Create a validator over an oracle.
    #[must_use]
    pub fn new(oracle: Arc<dyn SecurityOracle>) -> Self {
        Self { oracle }
    }
}

impl NodeValidator for SecurityValidator {
    fn validate(&self, ctx: &RequestContext, node: &NavNode) -> bool {
        self.oracle.can_read(ctx, &node.record)
    }
}

/// Rejects nodes whose record is explicitly hidden from navigation.
///
/// An unset flag counts as visible.
pub struct HiddenFromNavigationValidator;

impl NodeValidator for HiddenFromNavigationValidator {
    fn validate(&self, _ctx: &RequestContext, node: &NavNode) -> bool {
        node.record.hidden_from_navigation() != Some(true)
    }
}

/// Logical AND over an ordered list of validators.
///
/// Evaluation stops at the first rejection. An empty composite accepts.
#[derive(Clone, Default)]
pub struct CompositeValidator {
    validators: Vec<Arc<dyn NodeValidator>>,
}

impl CompositeValidator {
    /// Create a composite from validators, evaluated in order.
    #[must_use]
    pub fn new(validators: Vec<Arc<dyn NodeValidator>>) -> Self {
        Self { validators }
    }

    /// Append a validator.
    #[must_use]
    pub fn with(mut self, validator: Arc<dyn NodeValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Number of member validators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    /// Whether the composite has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl NodeValidator for CompositeValidator {
    fn validate(&self, ctx: &RequestContext, node: &NavNode) -> bool {
        self.validators.iter().all(|v| v.validate(ctx, node))
    }
}

/// Named validator, as listed in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidatorKind {
    /// [`SecurityValidator`].
    Security,
    /// [`HiddenFromNavigationValidator`].
    Hidden,
    /// [`AlwaysTrue`].
    Always,
    /// [`AlwaysFalse`].
    Never,
}

impl ValidatorKind {
    fn build(self, oracle: &Arc<dyn SecurityOracle>) -> Arc<dyn NodeValidator> {
        match self {
            Self::Security => Arc::new(SecurityValidator::new(Arc::clone(oracle))),
            Self::Hidden => Arc::new(HiddenFromNavigationValidator),
            Self::Always => Arc::new(AlwaysTrue),
            Self::Never => Arc::new(AlwaysFalse),
        }
    }
}

/// Build a composite from named validators.
#[must_use]
pub fn composite_from_kinds(
    kinds: &[ValidatorKind],
    oracle: &Arc<dyn SecurityOracle>,
) -> CompositeValidator {
    kinds
        .iter()
        .fold(CompositeValidator::default(), |composite, kind| {
            composite.with(kind.build(oracle))
        })
}

/// Validator kinds for the three chains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorKinds {
    /// Access chain members.
    pub access: Vec<ValidatorKind>,
    /// Listing chain members.
    pub listing: Vec<ValidatorKind>,
    /// Security chain members.
    pub security: Vec<ValidatorKind>,
}

impl Default for ValidatorKinds {
    fn default() -> Self {
        Self {
            access: vec![ValidatorKind::Security],
            listing: vec![ValidatorKind::Security],
            security: vec![ValidatorKind::Security],
        }
    }
}

/// The three validator chains a navigation tree consults.
#[derive(Clone)]
pub struct ValidatorChains {
    /// Gate for opening a node.
    pub access: CompositeValidator,
    /// Gate for listing a node among children.
    pub listing: CompositeValidator,
    /// Read-rights check.
    pub security: CompositeValidator,
}

impl ValidatorChains {
    /// Build chains from validator kinds over an oracle.
    #[must_use]
    pub fn from_kinds(kinds: &ValidatorKinds, oracle: &Arc<dyn SecurityOracle>) -> Self {
        Self {
            access: composite_from_kinds(&kinds.access, oracle),
            listing: composite_from_kinds(&kinds.listing, oracle),
            security: composite_from_kinds(&kinds.security, oracle),
        }
    }
}
