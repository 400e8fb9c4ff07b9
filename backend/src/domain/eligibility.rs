//! Eligibility gate: pure predicates deciding whether an entrant may join a
//! contest.
//!
//! Rules are values implementing [`EligibilityRule`]. The gate evaluates them
//! in insertion order and reports the first failure; adding a rule never
//! touches the registration engine.

use std::sync::Arc;

use super::{Contest, Entrant};

/// Minimum age applied when configuration does not override it.
pub const DEFAULT_MINIMUM_AGE: u32 = 18;

/// Why an entrant was turned away.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Ineligibility {
    /// The entrant is younger than the configured minimum.
    #[error("entrant is {age} but contests require a minimum age of {minimum}")]
    Underage {
        /// Entrant's age.
        age: u32,
        /// Minimum the rule enforces.
        minimum: u32,
    },
    /// A custom rule refused the entrant.
    #[error("{rule}: {message}")]
    Rule {
        /// Stable rule name, reported to clients.
        rule: String,
        /// Human-readable explanation.
        message: String,
    },
}

impl Ineligibility {
    /// Name of the rule that rejected the entrant.
    pub fn rule(&self) -> &str {
        match self {
            Self::Underage { .. } => MinimumAge::NAME,
            Self::Rule { rule, .. } => rule,
        }
    }
}

/// A single side-effect-free eligibility predicate.
#[cfg_attr(test, mockall::automock)]
pub trait EligibilityRule: Send + Sync {
    /// Return `Err` with the reason when `entrant` may not join `contest`.
    fn evaluate(&self, entrant: &Entrant, contest: &Contest) -> Result<(), Ineligibility>;
}

/// Requires `age >= minimum`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinimumAge {
    minimum: u32,
}

impl MinimumAge {
    const NAME: &'static str = "minimum_age";

    /// Create the rule with the given minimum age.
    pub const fn new(minimum: u32) -> Self {
        Self { minimum }
    }

    /// Minimum age the rule enforces.
    pub const fn minimum(&self) -> u32 {
        self.minimum
    }
}

impl Default for MinimumAge {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_AGE)
    }
}

impl EligibilityRule for MinimumAge {
    fn evaluate(&self, entrant: &Entrant, _contest: &Contest) -> Result<(), Ineligibility> {
        if entrant.age() >= self.minimum {
            Ok(())
        } else {
            Err(Ineligibility::Underage {
                age: entrant.age(),
                minimum: self.minimum,
            })
        }
    }
}

/// Ordered collection of eligibility rules.
///
/// # Examples
/// ```
/// use backend::domain::EligibilityGate;
///
/// let gate = EligibilityGate::with_minimum_age(18);
/// assert_eq!(gate.rule_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct EligibilityGate {
    rules: Vec<Arc<dyn EligibilityRule>>,
}

impl EligibilityGate {
    /// A gate with no rules; every entrant passes.
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate holding only the minimum-age rule.
    pub fn with_minimum_age(minimum: u32) -> Self {
        Self::new().with_rule(MinimumAge::new(minimum))
    }

    /// Append a rule; rules run in the order they were added.
    #[must_use]
    pub fn with_rule(mut self, rule: impl EligibilityRule + 'static) -> Self {
        self.rules.push(Arc::new(rule));
        self
    }

    /// Number of rules the gate evaluates.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// First failing rule's reason, or `Ok` when every rule passes.
    pub fn evaluate(&self, entrant: &Entrant, contest: &Contest) -> Result<(), Ineligibility> {
        self.rules
            .iter()
            .try_for_each(|rule| rule.evaluate(entrant, contest))
    }

    /// Whether every rule accepts `entrant` for `contest`.
    pub fn is_eligible(&self, entrant: &Entrant, contest: &Contest) -> bool {
        self.evaluate(entrant, contest).is_ok()
    }
}

impl std::fmt::Debug for EligibilityGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EligibilityGate")
            .field("rules", &self.rules.len())
            .finish()
    }
}
