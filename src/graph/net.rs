use super::WireIndex;
use crate::data_structures::{bit, mask};
use crate::error::StructuralError;

use smallvec::SmallVec;
use strum_macros::Display as StrumDisplay;

/// Amount of selected bits kept inline in a [Op::Select].
pub(super) const SELECT_TINYVEC_SIZE: usize = 4;

/// Amount of inputs kept in the stack for a net.
/// If a net has more than NET_INPUTS_TINYVEC_SIZE, they will spill into the heap.
pub(super) const NET_INPUTS_TINYVEC_SIZE: usize = 2;

/// Operation performed by a [Net].
///
/// Each operation carries a width rule, see [Op::width_rule].
#[derive(Clone, Debug, Eq, PartialEq, Hash, StrumDisplay)]
#[strum(serialize_all = "snake_case")]
pub enum Op {
    /// Pass-through, zero extending into a wider output.
    Wire,
    Not,
    And,
    Or,
    Xor,
    Nand,
    /// Sum with one bit of carry headroom.
    Add,
    /// Two's complement difference with one bit of borrow headroom.
    Sub,
    Mul,
    Eq,
    Lt,
    Gt,
    /// `(selector, when_zero, when_one)`.
    Mux,
    /// Picks the listed bits of its input, the first listed bit becomes bit 0.
    Select(SmallVec<[usize; SELECT_TINYVEC_SIZE]>),
    /// First input ends up in the most significant bits.
    Concat,
    /// Register transfer: the output shows the input of the previous cycle.
    Register,
}

use Op::*;

fn arity(op: &Op, expected: &'static str, actual: usize) -> StructuralError {
    StructuralError::Arity {
        op: op.clone(),
        expected,
        actual,
    }
}

impl Op {
    /// Returns true if `self` is a register transfer.
    pub fn is_register(&self) -> bool {
        matches!(self, Register)
    }

    /// Returns the output width an operation produces from inputs of `widths`.
    ///
    /// For [Op::Wire] this is the minimum output width, wider outputs are zero extended.
    ///
    /// # Example
    /// ```
    /// # use wirenet::Op;
    /// assert_eq!(Op::Add.width_rule(&[8, 3]), Ok(9));
    /// assert_eq!(Op::Mul.width_rule(&[8, 3]), Ok(11));
    /// assert_eq!(Op::Concat.width_rule(&[8, 3, 1]), Ok(12));
    /// assert!(Op::And.width_rule(&[8, 3]).is_err());
    /// ```
    pub fn width_rule(&self, widths: &[usize]) -> Result<usize, StructuralError> {
        let same = |rule| {
            if widths.windows(2).all(|w| w[0] == w[1]) {
                Ok(())
            } else {
                Err(StructuralError::OperandWidth {
                    op: self.clone(),
                    widths: widths.to_vec(),
                    rule,
                })
            }
        };
        match self {
            Wire | Not | Register | Select(_) if widths.len() != 1 => {
                Err(arity(self, "1", widths.len()))
            }
            And | Or | Xor | Nand | Add | Sub | Mul | Eq | Lt | Gt if widths.len() != 2 => {
                Err(arity(self, "2", widths.len()))
            }
            Mux if widths.len() != 3 => Err(arity(self, "3", widths.len())),
            Concat if widths.is_empty() => Err(arity(self, "at least 1", 0)),

            Wire | Not | Register => Ok(widths[0]),
            And | Or | Xor | Nand => {
                same("bitwise operands must have equal widths")?;
                Ok(widths[0])
            }
            Add | Sub => Ok(widths[0].max(widths[1]) + 1),
            Mul | Concat => Ok(widths.iter().sum()),
            Eq | Lt | Gt => {
                same("compared operands must have equal widths")?;
                Ok(1)
            }
            Mux => {
                if widths[0] != 1 {
                    return Err(StructuralError::OperandWidth {
                        op: self.clone(),
                        widths: widths.to_vec(),
                        rule: "mux selector must be 1 bit wide",
                    });
                }
                if widths[1] != widths[2] {
                    return Err(StructuralError::OperandWidth {
                        op: self.clone(),
                        widths: widths.to_vec(),
                        rule: "mux cases must have equal widths",
                    });
                }
                Ok(widths[1])
            }
            Select(bits) => {
                if let Some(&bit) = bits.iter().find(|&&b| b >= widths[0]) {
                    return Err(StructuralError::SelectOutOfRange {
                        bit,
                        width: widths[0],
                    });
                }
                Ok(bits.len())
            }
        }
    }

    /// Computes the value of a net from its input `args` of `widths`, truncated to `width`.
    ///
    /// Widths have been validated against [Op::width_rule] when the net was added, which
    /// guarantees no result needs more than `width` bits.
    /// Register transfers pass their input through, the delay is up to the evaluator.
    #[inline(always)]
    pub(crate) fn eval(&self, args: &[u128], widths: &[usize], width: usize) -> u128 {
        let value = match self {
            Wire | Register => args[0],
            Not => !args[0],
            And => args[0] & args[1],
            Or => args[0] | args[1],
            Xor => args[0] ^ args[1],
            Nand => !(args[0] & args[1]),
            Add => args[0].wrapping_add(args[1]),
            Sub => args[0].wrapping_sub(args[1]),
            Mul => args[0].wrapping_mul(args[1]),
            Eq => (args[0] == args[1]) as u128,
            Lt => (args[0] < args[1]) as u128,
            Gt => (args[0] > args[1]) as u128,
            Mux => {
                if args[0] & 1 == 0 {
                    args[1]
                } else {
                    args[2]
                }
            }
            Select(bits) => bits
                .iter()
                .enumerate()
                .filter(|(_, b)| bit(args[0], **b))
                .fold(0u128, |acc, (i, _)| acc | 1u128 << i),
            Concat => args.iter().zip(widths).fold(0u128, |acc, (value, width)| {
                acc.checked_shl(*width as u32).unwrap_or(0) | value
            }),
        };
        value & mask(width)
    }
}

/// A single assignment operation: `output = op(inputs)`.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Net {
    pub(super) op: Op,
    pub(super) inputs: SmallVec<[WireIndex; NET_INPUTS_TINYVEC_SIZE]>,
    pub(super) output: WireIndex,
}

impl Net {
    pub fn op(&self) -> &Op {
        &self.op
    }

    pub fn inputs(&self) -> &[WireIndex] {
        &self.inputs
    }

    pub fn output(&self) -> WireIndex {
        self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smallvec::smallvec;

    #[test]
    fn test_width_rules() {
        assert_eq!(Add.width_rule(&[8, 8]), Ok(9));
        assert_eq!(Sub.width_rule(&[4, 9]), Ok(10));
        assert_eq!(Mul.width_rule(&[4, 9]), Ok(13));
        assert_eq!(Register.width_rule(&[7]), Ok(7));
        assert_eq!(Select(smallvec![0, 3, 5]).width_rule(&[6]), Ok(3));
        assert_eq!(Mux.width_rule(&[1, 4, 4]), Ok(4));
        assert_eq!(Eq.width_rule(&[4, 4]), Ok(1));
    }

    #[test]
    fn test_width_rule_violations() {
        assert!(matches!(
            Add.width_rule(&[8]),
            Err(StructuralError::Arity { actual: 1, .. })
        ));
        assert!(matches!(
            Mux.width_rule(&[2, 4, 4]),
            Err(StructuralError::OperandWidth { .. })
        ));
        assert_eq!(
            Select(smallvec![8]).width_rule(&[8]),
            Err(StructuralError::SelectOutOfRange { bit: 8, width: 8 })
        );
        assert!(Concat.width_rule(&[]).is_err());
    }

    #[test]
    fn test_eval() {
        assert_eq!(Add.eval(&[255, 255], &[8, 8], 9), 510);
        // 3 - 5 in 5 bits is -2.
        assert_eq!(Sub.eval(&[3, 5], &[4, 4], 5), 0b11110);
        assert_eq!(Not.eval(&[0b1010], &[4], 4), 0b0101);
        assert_eq!(Nand.eval(&[0b1100, 0b1010], &[4, 4], 4), 0b0111);
        assert_eq!(Mux.eval(&[1, 3, 9], &[1, 4, 4], 4), 9);
        assert_eq!(Mux.eval(&[0, 3, 9], &[1, 4, 4], 4), 3);
        assert_eq!(Select(smallvec![3, 0]).eval(&[0b1000], &[4], 2), 0b01);
        assert_eq!(Concat.eval(&[0b1, 0b01], &[1, 2], 3), 0b101);
        assert_eq!(Lt.eval(&[2, 3], &[2, 2], 1), 1);
    }

    #[test]
    fn test_eval_full_width() {
        assert_eq!(Concat.eval(&[u128::MAX], &[128], 128), u128::MAX);
        assert_eq!(Mul.eval(&[1u128 << 63, 2], &[64, 64], 128), 1u128 << 64);
    }

    #[test]
    fn test_op_display() {
        assert_eq!(Add.to_string(), "add");
        assert_eq!(Register.to_string(), "register");
        assert_eq!(Select(smallvec![1]).to_string(), "select");
    }
}
