//! Validation/invalidation dependency graph.
//!
//! Each category of derived state (layout, transform, styles, ...) is a
//! single-bit flag backed by a node in a dependency graph. Invalidating a
//! flag cascades to its dependents; validating a flag resolves its
//! dependencies first. Nodes are kept in a dependency-consistent order at
//! insertion time, so one forward pass over the node list validates any
//! requested set of flags without fixed-point iteration.

use bitflags::bitflags;
use thiserror::Error;

bitflags! {
    /// One bit per independently dirty-able category of derived state.
    ///
    /// Bits 0–15 are reserved for the built-in flags below; component-defined
    /// flags start at bit 16 (see [`ValidationFlags::custom`]).
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct ValidationFlags: u32 {
        const STYLES = 1 << 0;
        const PROPERTIES = 1 << 1;
        const HIERARCHY_ASCENDING = 1 << 2;
        const HIERARCHY_DESCENDING = 1 << 3;
        const LAYOUT = 1 << 4;
        const LAYOUT_ENABLED = 1 << 5;
        const TRANSFORM = 1 << 6;
        const COLOR_TINT = 1 << 7;
        const INTERACTIVITY_MODE = 1 << 8;
        const VIEW_PROJECTION = 1 << 9;
        const VERTICES_GLOBAL = 1 << 10;
        const DRAW_REGION = 1 << 11;
    }
}

impl ValidationFlags {
    /// Every bit set, including custom flags: "validate everything".
    pub const ALL: Self = Self::from_bits_retain(u32::MAX);

    /// A component-defined flag. Slots 0–15 map to bits 16–31.
    pub fn custom(slot: u32) -> Self {
        assert!(slot < 16, "custom validation flag slot out of range: {slot}");
        Self::from_bits_retain(1 << (16 + slot))
    }
}

/// Human-readable list of the set bits, advisory only (error messages, logs).
pub fn flag_names(flags: ValidationFlags) -> String {
    let mut names = Vec::new();
    for bit in 0..32 {
        let flag = ValidationFlags::from_bits_retain(1 << bit);
        if !flags.intersects(flag) {
            continue;
        }
        names.push(match bit {
            0 => "STYLES".to_string(),
            1 => "PROPERTIES".to_string(),
            2 => "HIERARCHY_ASCENDING".to_string(),
            3 => "HIERARCHY_DESCENDING".to_string(),
            4 => "LAYOUT".to_string(),
            5 => "LAYOUT_ENABLED".to_string(),
            6 => "TRANSFORM".to_string(),
            7 => "COLOR_TINT".to_string(),
            8 => "INTERACTIVITY_MODE".to_string(),
            9 => "VIEW_PROJECTION".to_string(),
            10 => "VERTICES_GLOBAL".to_string(),
            11 => "DRAW_REGION".to_string(),
            _ => format!("BIT_{bit}"),
        });
    }
    if names.is_empty() {
        "(none)".to_string()
    } else {
        names.join("|")
    }
}

/// Node registration failures. These are programmer errors caught at
/// component construction time; they are not recoverable at runtime.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("validation flag {0:?} is not a single bit")]
    NotSingleBit(ValidationFlags),
    #[error("validation flag {0:?} is already registered")]
    DuplicateFlag(ValidationFlags),
    #[error("cyclic dependency between {0:?} and {1:?}")]
    CyclicDependency(ValidationFlags, ValidationFlags),
    #[error("dependency flags {0:?} are not registered")]
    UnknownFlags(ValidationFlags),
    #[error("nodes cannot be added while validation is in progress")]
    AddDuringValidation,
}

type Validator<C> = Box<dyn FnMut(&mut ValidationGraph<C>, &mut C)>;

fn noop_validator<C>(_: &mut ValidationGraph<C>, _: &mut C) {}

/// A single registered flag: its dependency masks, validity, and validator.
///
/// The dependency and dependent masks are transitive closures and always
/// include the node's own flag.
pub struct ValidationNode<C> {
    flag: ValidationFlags,
    dependencies: ValidationFlags,
    dependents: ValidationFlags,
    is_valid: bool,
    validated_count: u32,
    validator: Validator<C>,
}

impl<C> ValidationNode<C> {
    pub fn flag(&self) -> ValidationFlags {
        self.flag
    }

    pub fn dependencies(&self) -> ValidationFlags {
        self.dependencies
    }

    pub fn dependents(&self) -> ValidationFlags {
        self.dependents
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    /// How many times this node has been validated over its life.
    pub fn validated_count(&self) -> u32 {
        self.validated_count
    }
}

/// The dependency graph. Generic over a context type `C` that validators
/// mutate; the graph itself is passed back into validators so they may
/// invalidate their own dependents (and only those) mid-validation.
pub struct ValidationGraph<C> {
    nodes: Vec<ValidationNode<C>>,
    invalid_flags: ValidationFlags,
    registered: ValidationFlags,
    /// Index of the node whose validator is currently running.
    current_index: Option<usize>,
}

impl<C: 'static> Default for ValidationGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> ValidationGraph<C> {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            invalid_flags: ValidationFlags::empty(),
            registered: ValidationFlags::empty(),
            current_index: None,
        }
    }

    /// Register a validation node.
    ///
    /// The node list is kept in dependency-consistent order: every registered
    /// node a node depends on sits before it. A forward-declared dependency
    /// arriving after its dependents relocates the existing nodes as needed;
    /// only a genuine cycle is rejected.
    ///
    /// With `check_all_found` set, every bit named in `dependencies` and
    /// `dependents` must already be registered — this guards against typos in
    /// fixed flag sets. Leave it unset when flags of not-yet-registered nodes
    /// are expected (e.g. catch-all nodes).
    ///
    /// New nodes start invalid.
    pub fn add_node(
        &mut self,
        flag: ValidationFlags,
        dependencies: ValidationFlags,
        dependents: ValidationFlags,
        check_all_found: bool,
        validator: Validator<C>,
    ) -> Result<(), GraphError> {
        if self.current_index.is_some() {
            return Err(GraphError::AddDuringValidation);
        }
        if flag.bits().count_ones() != 1 {
            return Err(GraphError::NotSingleBit(flag));
        }
        if self.registered.intersects(flag) {
            return Err(GraphError::DuplicateFlag(flag));
        }
        if check_all_found {
            let unknown = (dependencies | dependents).difference(self.registered);
            if !unknown.is_empty() {
                return Err(GraphError::UnknownFlags(unknown));
            }
        }

        // Fold registered closures into the new node's masks so that both
        // masks are transitive. A node's masks always include its own flag.
        let mut node_dependencies = dependencies | flag;
        let mut node_dependents = dependents | flag;
        for node in &self.nodes {
            // An existing node upstream of anything the new node depends on
            // extends the dependency closure; one that depends on anything
            // downstream of the new node extends the dependent closure. The
            // intersection tests cover forward-declared flags: a dependent
            // registered before its dependency is found through its own
            // dependency mask.
            if node.dependents.intersects(node_dependencies) {
                node_dependencies |= node.dependencies;
            }
            if node.dependencies.intersects(node_dependents) {
                node_dependents |= node.dependents;
            }
        }
        // `difference` rather than `& !`: the `!` operator truncates to the
        // named bits and would drop custom flags.
        let overlap = (node_dependencies & node_dependents).difference(flag);
        if !overlap.is_empty() {
            return Err(GraphError::CyclicDependency(flag, overlap));
        }

        // Rebuild the stored order over the patched dependency closures. A
        // forward-declared dependency arriving late can force already-stored
        // nodes to move, so a single insertion slot is not enough. The index
        // `n` stands for the node being added.
        let n = self.nodes.len();
        let registered = self.registered | flag;
        let patched_deps: Vec<ValidationFlags> = self
            .nodes
            .iter()
            .map(|node| {
                if node.dependencies.intersects(node_dependents) {
                    node.dependencies | node_dependencies
                } else {
                    node.dependencies
                }
            })
            .chain(std::iter::once(node_dependencies))
            .collect();
        let flag_at = |i: usize| if i == n { flag } else { self.nodes[i].flag };

        let mut order = Vec::with_capacity(n + 1);
        let mut placed = vec![false; n + 1];
        let mut emitted = ValidationFlags::empty();
        while order.len() <= n {
            let ready = (0..=n).find(|&i| {
                !placed[i]
                    && (patched_deps[i] & registered)
                        .difference(flag_at(i) | emitted)
                        .is_empty()
            });
            let Some(i) = ready else {
                // Unreachable past the closure-overlap check above; kept as a
                // hard error rather than a panic.
                let stuck = (0..=n)
                    .filter(|&i| !placed[i])
                    .fold(ValidationFlags::empty(), |m, i| m | flag_at(i));
                return Err(GraphError::CyclicDependency(flag, stuck.difference(flag)));
            };
            placed[i] = true;
            emitted |= flag_at(i);
            order.push(i);
        }

        // Patch existing closures: upstream nodes now cascade through the
        // new node, downstream nodes now depend through it.
        for node in &mut self.nodes {
            if node.dependents.intersects(node_dependencies) {
                node.dependents |= node_dependents;
            }
            if node.dependencies.intersects(node_dependents) {
                node.dependencies |= node_dependencies;
            }
        }

        let mut slots: Vec<Option<ValidationNode<C>>> =
            self.nodes.drain(..).map(Some).collect();
        slots.push(Some(ValidationNode {
            flag,
            dependencies: node_dependencies,
            dependents: node_dependents,
            is_valid: false,
            validated_count: 0,
            validator,
        }));
        self.nodes = order.into_iter().filter_map(|i| slots[i].take()).collect();
        self.registered |= flag;
        self.invalid_flags |= flag;
        Ok(())
    }

    /// Mark the requested flags (and, cascading, their dependents) invalid.
    ///
    /// Returns the mask of flags that actually changed from valid to invalid;
    /// already-invalid flags are an idempotent no-op, unregistered flags are
    /// silently ignored.
    ///
    /// # Panics
    ///
    /// When called during validation for a currently-valid flag that is not
    /// a dependent of the node being validated. A validator dirtying state
    /// upstream of itself is the classic cyclic-dependency symptom and must
    /// fail loudly in development rather than leave stale state behind.
    pub fn invalidate(&mut self, flags: ValidationFlags) -> ValidationFlags {
        if flags.is_empty() {
            return ValidationFlags::empty();
        }
        if let Some(index) = self.current_index {
            let allowed = self.nodes[index].dependents;
            let fresh = (flags & self.registered).difference(self.invalid_flags);
            let illegal = fresh.difference(allowed);
            if !illegal.is_empty() {
                panic!(
                    "invalidated {} while validating {}; only its dependents ({}) may be \
                     invalidated during validation",
                    flag_names(illegal),
                    flag_names(self.nodes[index].flag),
                    flag_names(allowed),
                );
            }
        }

        let mut pending = flags;
        let mut invalidated = ValidationFlags::empty();
        // The node list is dependency-ordered, so dependents always come
        // after the node that cascades to them: one forward pass suffices.
        for node in &mut self.nodes {
            if node.is_valid && node.flag.intersects(pending) {
                node.is_valid = false;
                pending |= node.dependents;
                invalidated |= node.flag;
            }
        }
        self.invalid_flags |= invalidated;
        invalidated
    }

    /// Validate the requested flags, resolving dependencies first.
    ///
    /// Walks the node list in stored (dependency-consistent) order once,
    /// running the validator of every invalid node whose dependents intersect
    /// the requested set. Returns the mask of flags validated. A re-entrant
    /// call (from inside a validator) is a no-op returning the empty mask.
    pub fn validate(&mut self, flags: ValidationFlags, ctx: &mut C) -> ValidationFlags {
        if self.current_index.is_some() {
            return ValidationFlags::empty();
        }
        let mut to_validate = flags;
        let mut validated = ValidationFlags::empty();
        for i in 0..self.nodes.len() {
            if self.nodes[i].is_valid || !self.nodes[i].dependents.intersects(to_validate) {
                continue;
            }
            self.current_index = Some(i);
            self.nodes[i].is_valid = true;
            self.invalid_flags.remove(self.nodes[i].flag);
            // Extract the validator so it can be handed the graph itself
            // (for dependent invalidation) without aliasing the node.
            let mut validator =
                std::mem::replace(&mut self.nodes[i].validator, Box::new(noop_validator));
            validator(self, ctx);
            self.nodes[i].validator = validator;
            self.nodes[i].validated_count += 1;
            to_validate |= self.nodes[i].dependencies;
            validated |= self.nodes[i].flag;
        }
        self.current_index = None;
        validated
    }

    /// The accumulated mask of currently-invalid flags.
    pub fn invalid_flags(&self) -> ValidationFlags {
        self.invalid_flags
    }

    pub fn is_valid(&self, flag: ValidationFlags) -> bool {
        !self.invalid_flags.intersects(flag)
    }

    pub fn node(&self, flag: ValidationFlags) -> Option<&ValidationNode<C>> {
        self.nodes.iter().find(|n| n.flag == flag)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Registered flags in stored (dependency-consistent) order.
    pub fn flags_in_order(&self) -> Vec<ValidationFlags> {
        self.nodes.iter().map(|n| n.flag).collect()
    }
}
