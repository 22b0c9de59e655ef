//! Channel availability from the header band-selection bitstring

use crate::types::{Channel, NativeError, NativeResult};

/// Character marking a selected band in `SelectedBandIDs`
pub const SELECTION_MARKER: char = 'X';

/// Channels present in a file, always iterated in band-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSet {
    available: [bool; 12],
}

impl ChannelSet {
    /// Parse the 12-character `SelectedBandIDs` value.
    ///
    /// Position `i` maps to band `i + 1` of the channel table.
    pub fn from_selection(selection: &str) -> NativeResult<Self> {
        let chars: Vec<char> = selection.chars().collect();
        if chars.len() != Channel::ALL.len() {
            return Err(NativeError::InvalidFormat(format!(
                "Band selection '{}' has {} characters, expected {}",
                selection,
                chars.len(),
                Channel::ALL.len()
            )));
        }

        let mut available = [false; 12];
        for (slot, c) in available.iter_mut().zip(chars) {
            *slot = c == SELECTION_MARKER;
        }
        Ok(Self { available })
    }

    pub fn from_channels(channels: &[Channel]) -> Self {
        let mut available = [false; 12];
        for ch in channels {
            available[ch.index()] = true;
        }
        Self { available }
    }

    /// Selection string for this set, the inverse of `from_selection`
    pub fn to_selection(&self) -> String {
        self.available
            .iter()
            .map(|&on| if on { SELECTION_MARKER } else { '_' })
            .collect()
    }

    /// Every channel with its availability flag
    pub fn availability(&self) -> Vec<(Channel, bool)> {
        Channel::ALL
            .iter()
            .map(|&ch| (ch, self.available[ch.index()]))
            .collect()
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.available[channel.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = Channel> + '_ {
        Channel::ALL.iter().copied().filter(|ch| self.contains(*ch))
    }

    pub fn len(&self) -> usize {
        self.available.iter().filter(|&&on| on).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_hrv(&self) -> bool {
        self.contains(Channel::Hrv)
    }

    /// Present channels other than HRV, in record order
    pub fn visir_channels(&self) -> Vec<Channel> {
        self.iter().filter(|ch| !ch.is_hrv()).collect()
    }

    /// Slot of a standard channel within each line record
    pub fn visir_position(&self, channel: Channel) -> Option<usize> {
        if channel.is_hrv() {
            return None;
        }
        self.iter()
            .filter(|ch| !ch.is_hrv())
            .position(|ch| ch == channel)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Channel::name).collect()
    }
}
