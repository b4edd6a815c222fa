//! Closed interval arithmetic for VLAN ranges and address blocks

use std::net::IpAddr;
use std::ops::RangeInclusive;

use ipnet::IpNet;
use nettopo_shared_types::network::addr_to_u128;
use nettopo_shared_types::VlanRange;

/// A closed interval `[lower, upper]`
pub trait ClosedInterval {
    type Bound: Ord + Copy;

    fn lower(&self) -> Self::Bound;
    fn upper(&self) -> Self::Bound;
}

impl ClosedInterval for VlanRange {
    type Bound = i64;

    fn lower(&self) -> i64 {
        self.start
    }

    fn upper(&self) -> i64 {
        self.end
    }
}

impl<T: Ord + Copy> ClosedInterval for RangeInclusive<T> {
    type Bound = T;

    fn lower(&self) -> T {
        *self.start()
    }

    fn upper(&self) -> T {
        *self.end()
    }
}

/// CIDRs compare by their first and last address. The address family is
/// the most significant part of the bound, so IPv4 and IPv6 blocks never
/// overlap.
impl ClosedInterval for IpNet {
    type Bound = (u8, u128);

    fn lower(&self) -> (u8, u128) {
        address_bound(self.network())
    }

    fn upper(&self) -> (u8, u128) {
        address_bound(self.broadcast())
    }
}

fn address_bound(addr: IpAddr) -> (u8, u128) {
    let family = if addr.is_ipv4() { 4 } else { 6 };
    (family, addr_to_u128(addr))
}

/// Two closed intervals overlap unless one ends before the other starts.
/// Touching bounds count as an overlap.
pub fn overlaps<A, B>(a: &A, b: &B) -> bool
where
    A: ClosedInterval + ?Sized,
    B: ClosedInterval<Bound = A::Bound> + ?Sized,
{
    !(a.upper() < b.lower() || b.upper() < a.lower())
}

/// First overlapping pair, scanning `(i, j)` with `i < j` in input order
pub fn first_overlap<T: ClosedInterval>(items: &[T]) -> Option<(&T, &T)> {
    items.iter().enumerate().find_map(|(i, a)| {
        items[i + 1..]
            .iter()
            .find(|b| overlaps(a, *b))
            .map(|b| (a, b))
    })
}

/// True if any interval of `left` overlaps any interval of `right`
pub fn any_overlap<T: ClosedInterval>(left: &[T], right: &[T]) -> bool {
    left.iter().any(|a| right.iter().any(|b| overlaps(a, b)))
}

/// True if `vid` falls inside one of `ranges`
pub fn contains_vlan(ranges: &[VlanRange], vid: i64) -> bool {
    ranges.iter().any(|range| range.contains(vid))
}

/// Sorted scan for duplicates: returns the smallest repeated item
pub fn first_duplicate<'a, T, I>(items: I) -> Option<&'a T>
where
    T: Ord + ?Sized + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut sorted: Vec<&T> = items.into_iter().collect();
    sorted.sort();
    sorted
        .windows(2)
        .find(|pair| pair[0] == pair[1])
        .map(|pair| pair[0])
}
