//! Member selection policy.
//!
//! Decides which declared members of a type are encoded. The decision is order-dependent:
//! an annotation marked *fall-through* changes the default for every member declared after
//! it, until another fall-through annotation changes it again.
//!
//! | Annotation                  | This member | Default for later members |
//! |-----------------------------|-------------|---------------------------|
//! | none                        | follows default | unchanged             |
//! | `exclude`                   | skipped     | unchanged                 |
//! | `exclude, fall_through`     | skipped     | excluded                  |
//! | `include`                   | included    | unchanged                 |
//! | `include, fall_through`     | included    | included                  |
//!
//! The default starts out as "included".

/// A per-member policy annotation.
///
/// Derive users write `#[pack(exclude)]`, `#[pack(include)]` and add `fall_through` to
/// either. A bare `#[pack(fall_through)]` excludes, like a bare `#[pack(exclude)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Annotation {
    exclude: bool,
    fall_through: bool,
}

impl Annotation {
    /// Skip this member.
    pub const fn exclude() -> Self {
        Self {
            exclude: true,
            fall_through: false,
        }
    }

    /// Encode this member even if an earlier annotation excluded the members after it.
    pub const fn include() -> Self {
        Self {
            exclude: false,
            fall_through: false,
        }
    }

    /// Make this annotation's decision the default for the members declared after it.
    pub const fn fall_through(mut self) -> Self {
        self.fall_through = true;
        self
    }

    /// Whether the annotated member is skipped.
    pub const fn is_exclude(&self) -> bool {
        self.exclude
    }

    /// Whether the decision propagates forward.
    pub const fn is_fall_through(&self) -> bool {
        self.fall_through
    }
}

/// Returns the indices of the included members, in declaration order.
pub fn select_members(annotations: &[Option<Annotation>]) -> Vec<usize> {
    let mut include_by_default = true;
    let mut selected = Vec::with_capacity(annotations.len());

    for (index, annotation) in annotations.iter().enumerate() {
        let included = match annotation {
            None => include_by_default,
            Some(a) => {
                if a.fall_through {
                    include_by_default = !a.exclude;
                }
                !a.exclude
            }
        };
        if included {
            selected.push(index);
        }
    }
    selected
}
