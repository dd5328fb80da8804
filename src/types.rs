/// Index of an amplicon in the sorted list owned by `AmpliconIndex`.
pub type AmpliconId = u32;
/// Matrix coordinate: `(subject row, query column)`, both 1-based inside a path.
pub type Coord = (usize, usize);
/// Traceback path running 5' to 3'.
pub type Path = Vec<Coord>;

// Fast hash maps using AHash instead of the default SipHash.
// Build with `HashMap::default()`, or import `ahash::HashMapExt` for `::new()`.
pub(crate) type HashMap<K, V> = ahash::HashMap<K, V>;
