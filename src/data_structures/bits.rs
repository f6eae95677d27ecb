use num_integer::div_ceil;

/// Widest value a wire can carry.
pub const MAX_WIDTH: usize = 128;

/// Returns a mask with the `width` lowest bits set.
///
/// # Example
///
/// ```
/// # use wirenet::data_structures::mask;
/// assert_eq!(mask(1), 0b1);
/// assert_eq!(mask(9), 0x1ff);
/// assert_eq!(mask(128), u128::MAX);
/// ```
#[inline(always)]
pub fn mask(width: usize) -> u128 {
    if width >= MAX_WIDTH {
        u128::MAX
    } else {
        (1u128 << width) - 1
    }
}

/// Returns true if `value` can be represented in `width` bits without loss.
#[inline(always)]
pub fn fits(value: u128, width: usize) -> bool {
    value & !mask(width) == 0
}

/// Returns the number of hex digits needed to print any `width` bit value.
pub fn hex_digits(width: usize) -> usize {
    div_ceil(width.max(1), 4)
}

/// Returns the bit at `index` of `value`.
#[inline(always)]
pub fn bit(value: u128, index: usize) -> bool {
    index < MAX_WIDTH && (value >> index) & 1 == 1
}
