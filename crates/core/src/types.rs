/// Opaque animal identifier as issued by the herd directory.
pub type AnimalId = String;

/// Node address in the ancestor tree: root = 1, father of k = 2k, mother of k = 2k + 1.
pub type Position = usize;

/// Depth of the requested tree when the caller does not say otherwise.
pub const DEFAULT_LEVEL: u32 = 4;

/// Hard ceiling on tree depth; output size grows as 2^(level + 1).
pub const MAX_SUPPORTED_LEVEL: u32 = 20;
