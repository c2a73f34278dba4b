//! Page-table-entry encoding.
//!
//! The rest of this subsystem never inspects the `PTE_P`/`PTE_S` bits
//! directly: it works with [`Pte`], an explicit three-variant sum.
//! [`Pte::encode`] / [`Pte::decode`] are the only places the architectural
//! bit layout is touched, at the page-table edge where the subsystem hands a
//! raw PTE word to (or receives one from) a
//! [`crate::mm::collab::ProcessTable`] implementation.

use super::addr::FrameNumber;
use super::config::PGSIZE;

bitflags::bitflags! {
    /// Permission/status bits carried alongside a resident or swapped PTE.
    /// `PTE_P` and `PTE_S` are not represented here -- they are folded into
    /// the [`Pte`] variant itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u64 {
        /// Writable.
        const WRITABLE = 1 << 1;
        /// User-accessible.
        const USER     = 1 << 2;
        /// Accessed (referenced since last cleared).
        const ACCESSED = 1 << 5;
    }
}

/// A slot index into the swap-slot table.
pub type SlotIndex = usize;

/// The raw architectural PTE word, as exchanged with a
/// [`crate::mm::collab::ProcessTable`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawPte(pub u64);

const PTE_P: u64 = 1 << 0;
const PTE_S: u64 = 1 << 9;
/// Bits [12..) carry either a frame address (resident) or a slot index
/// (swapped).
const ADDR_SHIFT: u32 = 12;
const FLAGS_MASK: u64 = (1 << ADDR_SHIFT) - 1;

/// A page-table entry, decoded into its three possible states: resident,
/// swapped, or absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pte {
    /// No mapping at all.
    Absent,
    /// Present bit set, swapped bit clear: `pa[12..] | flags`.
    Resident { frame: FrameNumber, flags: PteFlags },
    /// Present bit clear, swapped bit set: `(slot << 12) | PTE_S`.
    Swapped { slot: SlotIndex, flags: PteFlags },
}

impl Pte {
    /// Decodes a raw architectural PTE word.
    pub fn decode(raw: RawPte) -> Self {
        let bits = raw.0;
        if bits & PTE_S != 0 {
            let slot = (bits >> ADDR_SHIFT) as usize;
            let flags = PteFlags::from_bits_truncate(bits & FLAGS_MASK);
            Pte::Swapped { slot, flags }
        } else if bits & PTE_P != 0 {
            let frame = FrameNumber::new(bits >> ADDR_SHIFT);
            let flags = PteFlags::from_bits_truncate(bits & FLAGS_MASK);
            Pte::Resident { frame, flags }
        } else {
            Pte::Absent
        }
    }

    /// Encodes this PTE back to its raw architectural word.
    pub fn encode(self) -> RawPte {
        match self {
            Pte::Absent => RawPte(0),
            Pte::Resident { frame, flags } => {
                RawPte((frame.as_u64() << ADDR_SHIFT) | PTE_P | flags.bits())
            }
            Pte::Swapped { slot, flags } => {
                RawPte(((slot as u64) << ADDR_SHIFT) | PTE_S | flags.bits())
            }
        }
    }

    /// Whether this PTE is swapped out.
    pub fn is_swapped(self) -> bool {
        matches!(self, Pte::Swapped { .. })
    }

    /// Whether this PTE is resident and writable.
    pub fn is_writable_resident(self) -> bool {
        matches!(self, Pte::Resident { flags, .. } if flags.contains(PteFlags::WRITABLE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resident_round_trips() {
        let pte = Pte::Resident {
            frame: FrameNumber::new(7),
            flags: PteFlags::WRITABLE | PteFlags::ACCESSED,
        };
        let raw = pte.encode();
        assert_eq!(Pte::decode(raw), pte);
        assert!(!pte.is_swapped());
        assert!(pte.is_writable_resident());
    }

    #[test]
    fn swapped_round_trips() {
        let pte = Pte::Swapped {
            slot: 3,
            flags: PteFlags::USER,
        };
        let raw = pte.encode();
        assert_eq!(Pte::decode(raw), pte);
        assert!(pte.is_swapped());
        assert!(!pte.is_writable_resident());
    }

    #[test]
    fn absent_round_trips() {
        assert_eq!(Pte::decode(RawPte(0)), Pte::Absent);
    }

    #[test]
    fn page_size_matches_addr_shift() {
        assert_eq!(1usize << ADDR_SHIFT, PGSIZE);
    }
}
