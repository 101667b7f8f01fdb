#![no_main]

use ext_bitmap::{ExtendedBitmap, RoaringUnit, Unit};
use libfuzzer_sys::arbitrary::{self, Arbitrary, Unstructured};
use libfuzzer_sys::fuzz_target;
use roaring::RoaringTreemap;
use std::mem;

const CAPACITY: u32 = 64;

type Bitmap = ExtendedBitmap<RoaringUnit<CAPACITY>>;

// Offset spans: inside the first unit, a few units, and many units.
const SPANS: [u64; 6] = [
    1,
    CAPACITY as u64,
    CAPACITY as u64 + 1,
    4 * CAPACITY as u64,
    64 * CAPACITY as u64,
    4_096 * CAPACITY as u64,
];

#[derive(Debug, Copy, Clone)]
struct Num(u64);

impl<'a> Arbitrary<'a> for Num {
    fn arbitrary(u: &mut Unstructured<'a>) -> arbitrary::Result<Self> {
        Ok(Self(u.arbitrary()?))
    }
}

#[derive(Arbitrary, Debug)]
enum Operation {
    Add(Num),
    Remove(Num),
    AddRange(Num, Num),
    RemoveRange(Num, Num),
    Check(Num),
    Extend(Num),
    CheckCardinality,
    CheckFirstLast,
    CheckIter,
    And,
    Or,
    Xor,
    AndNot,
    Not,
    SwapSides,
    SerializeRoundtrip,
}

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    span_idx: u8,
    initial_lhs: Vec<Num>,
    initial_rhs: Vec<Num>,
    ops: Vec<Operation>,
}

/// Assert that an extended bitmap and a treemap contain the same offsets.
fn check_equal(b: &Bitmap, t: &RoaringTreemap) {
    assert_eq!(b.cardinality(), t.len(), "cardinality mismatch");
    assert_eq!(b.first(), t.min(), "first mismatch");
    assert_eq!(b.last(), t.max(), "last mismatch");
    assert_eq!(b.is_empty(), t.is_empty(), "is_empty mismatch");

    let b_vals: Vec<u64> = b.iter().collect();
    let t_vals: Vec<u64> = t.iter().collect();
    assert_eq!(b_vals, t_vals, "iter mismatch");
}

/// Every unit but the last is full, and the bitmap size is their sum.
fn check_sizes(b: &Bitmap) {
    let units = b.units();
    let total: u64 = units.iter().map(|u| u.size()).sum();
    assert_eq!(b.size(), total, "size mismatch");
    if let Some((_, rest)) = units.split_last() {
        for (i, unit) in rest.iter().enumerate() {
            assert_eq!(unit.size(), CAPACITY as u64, "unit {} is not full", i);
        }
    }
    if let Some(last) = b.last() {
        assert!(last < b.size(), "last {} beyond size {}", last, b.size());
    }
}

fn make_pair(vals: &[Num], span: u64) -> (Bitmap, RoaringTreemap) {
    let mut b = Bitmap::new();
    let mut t = RoaringTreemap::new();
    for &Num(n) in vals {
        let v = n % span;
        b.add(v).unwrap();
        t.insert(v);
    }
    (b, t)
}

fuzz_target!(|input: FuzzInput| {
    let span = SPANS[input.span_idx as usize % SPANS.len()];

    let (mut lhs_b, mut lhs_t) = make_pair(&input.initial_lhs, span);
    let (mut rhs_b, mut rhs_t) = make_pair(&input.initial_rhs, span);

    check_equal(&lhs_b, &lhs_t);
    check_equal(&rhs_b, &rhs_t);

    for op in &input.ops {
        match *op {
            Operation::Add(Num(n)) => {
                let v = n % span;
                lhs_b.add(v).unwrap();
                lhs_t.insert(v);
            }
            Operation::Remove(Num(n)) => {
                let v = n % span;
                lhs_b.remove(v);
                lhs_t.remove(v);
            }
            Operation::AddRange(Num(a), Num(b)) => {
                let (a, b) = (a % span, b % span);
                let (lo, hi) = (a.min(b), a.max(b) + 1);
                lhs_b.add_range(lo..hi).unwrap();
                lhs_t.insert_range(lo..hi);
            }
            Operation::RemoveRange(Num(a), Num(b)) => {
                let (a, b) = (a % span, b % span);
                let (lo, hi) = (a.min(b), a.max(b) + 1);
                lhs_b.remove_range(lo..hi);
                lhs_t.remove_range(lo..hi);
            }
            Operation::Check(Num(n)) => {
                let v = n % span;
                assert_eq!(lhs_b.check(v), lhs_t.contains(v), "check({}) mismatch", v);
            }
            Operation::Extend(Num(n)) => {
                let new_size = n % (span + 1);
                let before = lhs_b.size();
                let grew = lhs_b.extend(new_size).unwrap();
                assert_eq!(grew, new_size > before, "extend({}) result mismatch", new_size);
                assert_eq!(lhs_b.size(), before.max(new_size), "extend({}) size mismatch", new_size);
            }
            Operation::CheckCardinality => {
                assert_eq!(lhs_b.cardinality(), lhs_t.len(), "cardinality mismatch");
            }
            Operation::CheckFirstLast => {
                assert_eq!(lhs_b.first(), lhs_t.min(), "first mismatch");
                assert_eq!(lhs_b.last(), lhs_t.max(), "last mismatch");
            }
            Operation::CheckIter => {
                assert!(lhs_b.iter().eq(lhs_t.iter()), "iter mismatch");
            }
            Operation::And => {
                lhs_b = lhs_b.and(&rhs_b);
                lhs_t &= &rhs_t;
            }
            Operation::Or => {
                lhs_b = lhs_b.or(&rhs_b);
                lhs_t |= &rhs_t;
            }
            Operation::Xor => {
                lhs_b = lhs_b.xor(&rhs_b);
                lhs_t ^= &rhs_t;
            }
            Operation::AndNot => {
                lhs_b = lhs_b.and_not(&rhs_b);
                lhs_t -= &rhs_t;
            }
            Operation::Not => {
                let mut full = RoaringTreemap::new();
                full.insert_range(0..lhs_b.size());
                lhs_b = lhs_b.not();
                lhs_t = &full - &lhs_t;
            }
            Operation::SwapSides => {
                mem::swap(&mut lhs_b, &mut rhs_b);
                mem::swap(&mut lhs_t, &mut rhs_t);
            }
            Operation::SerializeRoundtrip => {
                let bytes = lhs_b.to_bytes().unwrap();
                assert_eq!(bytes.len(), lhs_b.serialized_size(), "serialized_size mismatch");
                let restored = Bitmap::from_bytes(&bytes).unwrap();
                assert!(restored.iter().eq(lhs_b.iter()), "serialize roundtrip mismatch");
                assert_eq!(restored.unit_count(), lhs_b.unit_count(), "unit count mismatch");
            }
        }
        check_sizes(&lhs_b);
    }

    check_equal(&lhs_b, &lhs_t);
    check_equal(&rhs_b, &rhs_t);
});
