//! CPCEMU disk images, standard (`MV - CPCEMU`) and extended (`EXTENDED`).
//!
//! Both variants open with a 256-byte Disk-Info block followed by one
//! Track-Info block per track and side. Standard images use a single
//! track size from the header; extended images carry a per-track size
//! table at 0x34 and per-sector data lengths. Images are always written
//! back in the extended layout, which can represent anything either
//! variant can.

#![allow(clippy::cast_possible_truncation)]

use std::fmt;

const STANDARD_HEADER: &[u8] = b"MV - CPCEMU";
const EXTENDED_HEADER: &[u8] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";
const TRACK_HEADER: &[u8] = b"Track-Info\r\n";
const CREATOR: &[u8] = b"emu198x-cpc";

/// Sector filler written by FORMAT on the CPC.
pub const FILLER: u8 = 0xE5;

/// Disk image parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DskError {
    /// Shorter than the 256-byte Disk-Info block.
    TooShort,
    /// Neither the standard nor the extended signature.
    BadSignature,
    /// A Track-Info block is cut short or mislabelled.
    BadTrack { index: usize },
}

impl fmt::Display for DskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort => write!(f, "disk image shorter than its header"),
            Self::BadSignature => write!(f, "not a CPCEMU disk image"),
            Self::BadTrack { index } => write!(f, "malformed Track-Info block {index}"),
        }
    }
}

impl std::error::Error for DskError {}

/// Layout of a freshly formatted CPC disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskFormat {
    /// AMSDOS data format: sectors &C1-&C9, no reserved tracks.
    Data,
    /// AMSDOS system (vendor) format: sectors &41-&49, two reserved tracks.
    System,
}

impl DiskFormat {
    const fn first_sector(self) -> u8 {
        match self {
            Self::Data => 0xC1,
            Self::System => 0x41,
        }
    }
}

/// A single sector: its ID field, recorded status and payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub c: u8,
    pub h: u8,
    pub r: u8,
    pub n: u8,
    pub st1: u8,
    pub st2: u8,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub cylinder: u8,
    pub side: u8,
    pub gap3: u8,
    pub filler: u8,
    pub sectors: Vec<Sector>,
}

/// In-memory disk image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DskImage {
    pub sides: u8,
    pub tracks: Vec<Track>,
    dirty: bool,
}

fn le16(data: &[u8], at: usize) -> usize {
    usize::from(u16::from_le_bytes([data[at], data[at + 1]]))
}

impl DskImage {
    /// Parse a standard or extended image.
    pub fn parse(data: &[u8]) -> Result<Self, DskError> {
        if data.len() < 0x100 {
            return Err(DskError::TooShort);
        }
        let extended = data.starts_with(EXTENDED_HEADER);
        if !extended && !data.starts_with(STANDARD_HEADER) {
            return Err(DskError::BadSignature);
        }

        let cylinders = usize::from(data[0x30]);
        let sides = data[0x31].max(1);
        let count = cylinders * usize::from(sides);
        let standard_size = le16(data, 0x32);

        let mut tracks = Vec::with_capacity(count);
        let mut offset = 0x100;
        for index in 0..count {
            let size = if extended {
                usize::from(data.get(0x34 + index).copied().unwrap_or(0)) * 0x100
            } else {
                standard_size
            };
            if size == 0 {
                // Unformatted track.
                continue;
            }
            let Some(block) = data.get(offset..) else {
                break;
            };
            if block.len() < 0x100 {
                break;
            }
            tracks.push(parse_track(block, extended).ok_or(DskError::BadTrack { index })?);
            offset += size;
        }

        Ok(Self { sides, tracks, dirty: false })
    }

    /// A blank image formatted the way AMSDOS formats a 40-track disk.
    #[must_use]
    pub fn formatted(format: DiskFormat) -> Self {
        let mut image = Self { sides: 1, tracks: Vec::with_capacity(40), dirty: false };
        // AMSDOS interleave: 1 6 2 7 3 8 4 9 5.
        const ORDER: [u8; 9] = [0, 5, 1, 6, 2, 7, 3, 8, 4];
        for cylinder in 0..40 {
            let ids: Vec<(u8, u8, u8, u8)> = ORDER
                .iter()
                .map(|&i| (cylinder, 0, format.first_sector() + i, 2))
                .collect();
            image.format_track(cylinder, 0, &ids, FILLER);
        }
        image.dirty = false;
        image
    }

    /// True once a sector write or format has changed the image.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    #[must_use]
    pub fn track(&self, cylinder: u8, side: u8) -> Option<&Track> {
        self.tracks.iter().find(|t| t.cylinder == cylinder && t.side == side)
    }

    /// Find sector `r` with cylinder ID `c` on a physical track.
    #[must_use]
    pub fn sector(&self, cylinder: u8, side: u8, c: u8, r: u8) -> Option<&Sector> {
        self.track(cylinder, side)?.sectors.iter().find(|s| s.c == c && s.r == r)
    }

    /// Overwrite a sector's payload and its deleted-data mark.
    /// Returns false if the sector is absent.
    pub fn write_sector(&mut self, cylinder: u8, side: u8, c: u8, r: u8, data: &[u8], deleted: bool) -> bool {
        let sector = self
            .tracks
            .iter_mut()
            .filter(|t| t.cylinder == cylinder && t.side == side)
            .flat_map(|t| t.sectors.iter_mut())
            .find(|s| s.c == c && s.r == r);
        let Some(sector) = sector else {
            return false;
        };
        let len = data.len().min(sector.data.len());
        sector.data[..len].copy_from_slice(&data[..len]);
        if deleted {
            sector.st2 |= 0x40;
        } else {
            sector.st2 &= !0x40;
        }
        self.dirty = true;
        true
    }

    /// Replace a physical track with freshly formatted sectors.
    pub fn format_track(&mut self, cylinder: u8, side: u8, ids: &[(u8, u8, u8, u8)], filler: u8) {
        let sectors = ids
            .iter()
            .map(|&(c, h, r, n)| Sector {
                c,
                h,
                r,
                n,
                st1: 0,
                st2: 0,
                data: vec![filler; 128 << n.min(6)],
            })
            .collect();
        let track = Track { cylinder, side, gap3: 0x4E, filler, sectors };
        match self.tracks.iter_mut().find(|t| t.cylinder == cylinder && t.side == side) {
            Some(existing) => *existing = track,
            None => {
                self.tracks.push(track);
                self.tracks.sort_by_key(|t| (t.cylinder, t.side));
            }
        }
        self.sides = self.sides.max(side + 1);
        self.dirty = true;
    }

    /// Serialise as an extended image.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let cylinders = self.tracks.iter().map(|t| usize::from(t.cylinder) + 1).max().unwrap_or(0);
        let sides = usize::from(self.sides.max(1));

        let mut header = vec![0u8; 0x100];
        header[..EXTENDED_HEADER.len()].copy_from_slice(EXTENDED_HEADER);
        header[0x22..0x22 + CREATOR.len()].copy_from_slice(CREATOR);
        header[0x30] = cylinders as u8;
        header[0x31] = sides as u8;

        let mut body = Vec::new();
        for cylinder in 0..cylinders {
            for side in 0..sides {
                let slot = 0x34 + cylinder * sides + side;
                if let Some(track) = self.track(cylinder as u8, side as u8) {
                    let block = serialise_track(track);
                    if slot < 0x100 {
                        header[slot] = (block.len() / 0x100) as u8;
                    }
                    body.extend_from_slice(&block);
                }
            }
        }
        header.extend_from_slice(&body);
        header
    }
}

fn parse_track(block: &[u8], extended: bool) -> Option<Track> {
    if !block.starts_with(TRACK_HEADER) {
        return None;
    }
    let size_code = block[0x14];
    let count = usize::from(block[0x15]).min(29);
    let mut sectors = Vec::with_capacity(count);
    let mut offset = 0x100;
    for info in block[0x18..0x18 + count * 8].chunks_exact(8) {
        let declared = 128usize << info[3].min(6);
        let size = if extended { le16(info, 6) } else { 128usize << size_code.min(6) };
        let mut data = vec![0u8; if extended { size } else { declared.min(size) }];
        let available = block.len().saturating_sub(offset).min(data.len());
        data[..available].copy_from_slice(&block[offset..offset + available]);
        offset += size;
        sectors.push(Sector {
            c: info[0],
            h: info[1],
            r: info[2],
            n: info[3],
            st1: info[4],
            st2: info[5],
            data,
        });
    }
    Some(Track {
        cylinder: block[0x10],
        side: block[0x11],
        gap3: block[0x16],
        filler: block[0x17],
        sectors,
    })
}

fn serialise_track(track: &Track) -> Vec<u8> {
    let mut block = vec![0u8; 0x100];
    block[..TRACK_HEADER.len()].copy_from_slice(TRACK_HEADER);
    block[0x10] = track.cylinder;
    block[0x11] = track.side;
    block[0x14] = track.sectors.first().map_or(2, |s| s.n);
    block[0x15] = track.sectors.len() as u8;
    block[0x16] = track.gap3;
    block[0x17] = track.filler;
    for (info, sector) in block[0x18..].chunks_exact_mut(8).zip(&track.sectors) {
        let len = (sector.data.len() as u16).to_le_bytes();
        info.copy_from_slice(&[sector.c, sector.h, sector.r, sector.n, sector.st1, sector.st2, len[0], len[1]]);
    }
    for sector in &track.sectors {
        block.extend_from_slice(&sector.data);
    }
    block.resize(block.len().div_ceil(0x100) * 0x100, 0);
    block
}
