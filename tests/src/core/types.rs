use tcg_core::{Cond, Type};

#[test]
fn type_sizes() {
    assert_eq!(Type::I32.size_bits(), 32);
    assert_eq!(Type::I64.size_bits(), 64);
}

#[test]
fn type_masks() {
    assert_eq!(Type::I32.mask(), 0xffff_ffff);
    assert_eq!(Type::I64.mask(), u64::MAX);
}

#[test]
fn cond_invert_is_involution() {
    let conds = [
        Cond::Never,
        Cond::Always,
        Cond::Eq,
        Cond::Ne,
        Cond::Lt,
        Cond::Ge,
        Cond::Le,
        Cond::Gt,
        Cond::Ltu,
        Cond::Geu,
        Cond::Leu,
        Cond::Gtu,
    ];
    for c in conds {
        assert_eq!(c.invert().invert(), c, "invert is not involution for {c:?}");
    }
}

#[test]
fn cond_swap_is_involution() {
    let conds = [
        Cond::Eq,
        Cond::Ne,
        Cond::Lt,
        Cond::Ge,
        Cond::Le,
        Cond::Gt,
        Cond::Ltu,
        Cond::Geu,
        Cond::Leu,
        Cond::Gtu,
    ];
    for c in conds {
        assert_eq!(c.swap().swap(), c, "swap is not involution for {c:?}");
    }
}

#[test]
fn cond_swap_examples() {
    assert_eq!(Cond::Lt.swap(), Cond::Gt);
    assert_eq!(Cond::Ltu.swap(), Cond::Gtu);
    assert_eq!(Cond::Eq.swap(), Cond::Eq);
}

#[test]
fn cond_signed_unsigned() {
    assert!(Cond::Lt.is_signed());
    assert!(!Cond::Lt.is_unsigned());
    assert!(Cond::Ltu.is_unsigned());
    assert!(!Cond::Eq.is_signed());
    assert!(!Cond::Eq.is_unsigned());
}
