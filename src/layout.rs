//! Layout arithmetic for C-style sequential field placement.
//!
//! Every composite codec in the format places field *i* at
//! `align_up(cumulative_offset, field_align)` and pads the total size up to a
//! multiple of the composite's own alignment (the maximum field alignment).

/// Rounds `pos` up to the next multiple of `align`. `align` must be >= 1.
pub fn align_up(pos: usize, align: usize) -> usize {
    debug_assert!(align >= 1);
    (pos + align - 1) / align * align
}

/// The distance between consecutive elements of size `size` aligned to `align`.
pub fn stride(size: usize, align: usize) -> usize {
    align_up(size, align.max(1))
}

/// Computed placement of a sequence of (size, align) fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeqLayout {
    /// Byte offset of each field from the start of the composite.
    pub offsets: Vec<usize>,
    /// Total size, padded to a multiple of `align`.
    pub size: usize,
    /// Maximum field alignment (>= 1).
    pub align: usize,
}

/// Lays out fields sequentially in declaration order.
///
/// Returns the per-field offsets plus the padded total size and the composite
/// alignment. An empty field list yields size 0, align 1.
pub fn seq_layout(fields: &[(usize, usize)]) -> SeqLayout {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut cursor = 0usize;
    let mut align = 1usize;

    for &(size, field_align) in fields {
        let field_align = field_align.max(1);
        cursor = align_up(cursor, field_align);
        offsets.push(cursor);
        cursor += size;
        align = align.max(field_align);
    }

    SeqLayout {
        offsets,
        size: align_up(cursor, align),
        align,
    }
}
