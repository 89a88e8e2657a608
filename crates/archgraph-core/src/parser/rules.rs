//! Ordered role-classification tables.
//!
//! Each ecosystem describes its structural-role inference as a list of
//! `(predicate, role)` rules evaluated top to bottom; the first match wins.

use super::contract::StructuralRole;

/// One classification rule over a subject `S`.
pub struct RoleRule<S: ?Sized> {
    /// Short label used in logs and tests.
    pub name: &'static str,
    pub role: StructuralRole,
    pub matches: fn(&S) -> bool,
}

impl<S: ?Sized> RoleRule<S> {
    pub const fn new(name: &'static str, role: StructuralRole, matches: fn(&S) -> bool) -> Self {
        Self {
            name,
            role,
            matches,
        }
    }
}

/// First matching rule, if any.
pub fn first_match<'r, S: ?Sized>(rules: &'r [RoleRule<S>], subject: &S) -> Option<&'r RoleRule<S>> {
    rules.iter().find(|rule| (rule.matches)(subject))
}

/// Role of the first matching rule, `Unknown` when nothing matches.
pub fn classify<S: ?Sized>(rules: &[RoleRule<S>], subject: &S) -> StructuralRole {
    first_match(rules, subject)
        .map(|rule| rule.role)
        .unwrap_or(StructuralRole::Unknown)
}
