//! Operand-ownership classification.
//!
//! Every (instruction, operand position) pair classifies totally into one
//! of the variants below, given the static ownership of the used value.
//! The set is closed; lifetime analyses dispatch on it exhaustively.

use crate::{insn::InsnData, Ownership};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandOwnership {
    /// The operand does not semantically use the value (scope tokens).
    NonUse,
    /// The operand can only handle trivial values.
    TrivialUse,
    /// A momentary, non-consuming use.
    InstantaneousUse,
    /// A momentary use that also accepts unowned values.
    UnownedInstantaneousUse,
    /// The use forwards the value into an unowned value.
    ForwardingUnowned,
    /// The use lets the value escape through a raw pointer.
    PointerEscape,
    /// The use observes only the bit pattern of the value.
    BitwiseEscape,
    /// The use consumes the value and forwards ownership to a result.
    ForwardingConsume,
    /// The use consumes and destroys the value.
    DestroyingConsume,
    /// The use opens a borrow scope over the value.
    Borrow,
    /// The use projects an interior address out of a borrowed value.
    InteriorPointer,
    /// The use forwards a borrow into another guaranteed value.
    ForwardingBorrow,
    /// The use ends a borrow scope.
    EndBorrow,
    /// The use forwards a borrow to a guaranteed phi across a branch.
    Reborrow,
}

impl OperandOwnership {
    /// Whether a use with this classification ends the lifetime of an
    /// owned value.
    pub fn is_lifetime_ending(self) -> bool {
        matches!(self, Self::ForwardingConsume | Self::DestroyingConsume)
    }
}

/// Classification for an operand that forwards into a phi or result with
/// the value's own ownership.
fn forwarding(ownership: Ownership) -> OperandOwnership {
    match ownership {
        Ownership::Owned => OperandOwnership::ForwardingConsume,
        Ownership::Guaranteed => OperandOwnership::ForwardingBorrow,
        Ownership::Unowned => OperandOwnership::ForwardingUnowned,
        Ownership::None => OperandOwnership::TrivialUse,
    }
}

/// Classification for a branch argument bound to a destination parameter.
fn branch_arg(ownership: Ownership) -> OperandOwnership {
    match ownership {
        Ownership::Owned => OperandOwnership::ForwardingConsume,
        Ownership::Guaranteed => OperandOwnership::Reborrow,
        Ownership::Unowned => OperandOwnership::ForwardingUnowned,
        Ownership::None => OperandOwnership::TrivialUse,
    }
}

impl InsnData {
    /// Classify the operand at canonical position `pos`, used at the given
    /// value ownership.
    pub fn operand_ownership(&self, pos: usize, ownership: Ownership) -> OperandOwnership {
        match self {
            Self::Call { .. } => match ownership {
                Ownership::Owned | Ownership::Guaranteed => OperandOwnership::InstantaneousUse,
                Ownership::Unowned => OperandOwnership::UnownedInstantaneousUse,
                Ownership::None => OperandOwnership::TrivialUse,
            },
            Self::Alloca { .. } => unreachable!("alloca has no operands"),
            Self::Load { .. } => OperandOwnership::TrivialUse,
            Self::Store { .. } => {
                if pos == 0 {
                    match ownership {
                        Ownership::Owned => OperandOwnership::DestroyingConsume,
                        Ownership::None => OperandOwnership::TrivialUse,
                        Ownership::Guaranteed | Ownership::Unowned => {
                            OperandOwnership::InstantaneousUse
                        }
                    }
                } else {
                    OperandOwnership::TrivialUse
                }
            }
            Self::Aggregate { .. } => forwarding(ownership),
            Self::Copy { .. } | Self::DebugValue { .. } => OperandOwnership::InstantaneousUse,
            Self::Destroy { .. } => OperandOwnership::DestroyingConsume,
            Self::Borrow { .. } => OperandOwnership::Borrow,
            Self::EndBorrow { .. } => OperandOwnership::EndBorrow,
            Self::FieldPtr { .. } => OperandOwnership::InteriorPointer,
            Self::RefToPtr { .. } => OperandOwnership::PointerEscape,
            Self::RefToUnowned { .. } => OperandOwnership::ForwardingUnowned,
            Self::UnownedToRef { .. } => OperandOwnership::UnownedInstantaneousUse,
            Self::RefToInt { .. } => OperandOwnership::BitwiseEscape,
            Self::BeginAccess { .. } => OperandOwnership::TrivialUse,
            Self::EndAccess { .. } | Self::EndUnpairedAccess { .. } => OperandOwnership::NonUse,
            Self::Jump { .. } => branch_arg(ownership),
            Self::Br { .. } => {
                if pos == 0 {
                    OperandOwnership::TrivialUse
                } else {
                    branch_arg(ownership)
                }
            }
            Self::Return { .. } => forwarding(ownership),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dfg::Block, insn::BranchDest, Type, ValueId};

    fn v(n: u32) -> ValueId {
        ValueId(n)
    }

    #[test]
    fn consuming_operands() {
        let store = InsnData::Store { args: [v(0), v(1)] };
        assert_eq!(
            store.operand_ownership(0, Ownership::Owned),
            OperandOwnership::DestroyingConsume
        );
        assert_eq!(
            store.operand_ownership(1, Ownership::None),
            OperandOwnership::TrivialUse
        );

        let destroy = InsnData::destroy(v(0));
        assert_eq!(
            destroy.operand_ownership(0, Ownership::Owned),
            OperandOwnership::DestroyingConsume
        );

        let ret = InsnData::Return { args: Some(v(0)) };
        assert_eq!(
            ret.operand_ownership(0, Ownership::Owned),
            OperandOwnership::ForwardingConsume
        );
    }

    #[test]
    fn branch_operands() {
        let b0 = Block(0);
        let b1 = Block(1);
        let br = InsnData::br(
            v(9),
            BranchDest::new(b0, &[v(0)]),
            BranchDest::new(b1, &[]),
        );
        assert_eq!(
            br.operand_ownership(0, Ownership::None),
            OperandOwnership::TrivialUse
        );
        assert_eq!(
            br.operand_ownership(1, Ownership::Owned),
            OperandOwnership::ForwardingConsume
        );
        assert_eq!(
            br.operand_ownership(1, Ownership::Guaranteed),
            OperandOwnership::Reborrow
        );
    }

    #[test]
    fn escape_operands() {
        let escape = InsnData::RefToPtr { args: [v(0)] };
        assert_eq!(
            escape.operand_ownership(0, Ownership::Owned),
            OperandOwnership::PointerEscape
        );

        let bits = InsnData::RefToInt { args: [v(0)] };
        assert_eq!(
            bits.operand_ownership(0, Ownership::Owned),
            OperandOwnership::BitwiseEscape
        );

        let unowned = InsnData::RefToUnowned { args: [v(0)] };
        assert_eq!(
            unowned.operand_ownership(0, Ownership::Owned),
            OperandOwnership::ForwardingUnowned
        );
    }

    #[test]
    fn borrow_operands() {
        let borrow = InsnData::Borrow { args: [v(0)] };
        assert_eq!(
            borrow.operand_ownership(0, Ownership::Owned),
            OperandOwnership::Borrow
        );

        let end = InsnData::EndBorrow { args: [v(1)] };
        assert_eq!(
            end.operand_ownership(0, Ownership::Guaranteed),
            OperandOwnership::EndBorrow
        );

        let field = InsnData::FieldPtr {
            args: [v(1)],
            idx: 0,
        };
        assert_eq!(
            field.operand_ownership(0, Ownership::Guaranteed),
            OperandOwnership::InteriorPointer
        );
    }

    #[test]
    fn access_tokens_are_not_uses() {
        let end = InsnData::EndAccess { args: [v(0)] };
        assert_eq!(
            end.operand_ownership(0, Ownership::None),
            OperandOwnership::NonUse
        );
    }

    #[test]
    fn call_ignores_type_of_result() {
        let call = InsnData::call("use", &[v(0)], Type::Unit);
        assert_eq!(
            call.operand_ownership(0, Ownership::Owned),
            OperandOwnership::InstantaneousUse
        );
        assert_eq!(
            call.operand_ownership(0, Ownership::Unowned),
            OperandOwnership::UnownedInstantaneousUse
        );
    }
}
