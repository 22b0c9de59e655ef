use crate::config::{CalibrationMode, ReaderConfig};
use crate::core::area::{Area, AreaDefinition};
use crate::core::calibrate::{mask_fill, CalibrationProcessor, RadiometricInversion, SeviriInversion};
use crate::core::geolocation::{AreaExtentKind, GeolocationResolver, WindowExtent};
use crate::io::channels::ChannelSet;
use crate::io::data_block::DataBlockView;
use crate::io::header::FileHeader;
use crate::io::layout::LineLayout;
use crate::io::trailer::Trailer;
use crate::types::{
    CalibratedDataset, CalibrationLevel, Channel, CountImage, DatasetAttributes, NativeError,
    NativeResult, OrbitalParameters, Platform, ProjectionParameters,
};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Reader for one SEVIRI Level 1.5 native file.
///
/// Header, line layout and trailer are decoded once on open; pixel data is
/// unpacked and calibrated per request from a memory-mapped view.
pub struct NativeReader {
    path: PathBuf,
    config: ReaderConfig,
    header: FileHeader,
    channels: ChannelSet,
    platform: Platform,
    layout: LineLayout,
    data: DataBlockView,
    trailer: Trailer,
}

impl NativeReader {
    /// Open a native file with the default configuration
    pub fn open<P: AsRef<Path>>(path: P) -> NativeResult<Self> {
        Self::with_config(path, ReaderConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(path: P, config: ReaderConfig) -> NativeResult<Self> {
        config.validate()?;
        let path = path.as_ref().to_path_buf();

        if !path.exists() {
            return Err(NativeError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            )));
        }

        let header = FileHeader::read(&path)?;
        let channels = ChannelSet::from_selection(&header.selected_band_ids)?;
        let platform = Platform::from_satellite_id(header.satellite_id)?;
        let layout = LineLayout::resolve(&header, &channels)?;
        let data = DataBlockView::open(&path, layout)?;
        let trailer = Trailer::read(&path, layout.trailer_offset() as u64)?;

        log::info!(
            "Opened {} ({}, channels {:?}, full disk: {})",
            path.display(),
            platform,
            channels.names(),
            layout.is_full_disk
        );

        Ok(Self {
            path,
            config,
            header,
            channels,
            platform,
            layout,
            data,
            trailer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn calib_mode(&self) -> CalibrationMode {
        self.config.calib_mode
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    pub fn channels(&self) -> &ChannelSet {
        &self.channels
    }

    pub fn layout(&self) -> &LineLayout {
        &self.layout
    }

    pub fn data_block(&self) -> &DataBlockView {
        &self.data
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn platform_name(&self) -> String {
        self.platform.name()
    }

    pub fn is_full_disk(&self) -> bool {
        self.layout.is_full_disk
    }

    pub fn projection_parameters(&self) -> ProjectionParameters {
        self.header.projection_parameters()
    }

    /// Start of the repeat cycle (TrueRepeatCycleStart)
    pub fn start_time(&self) -> DateTime<Utc> {
        self.header.true_repeat_cycle_start
    }

    /// End of the repeat cycle (PlannedRepeatCycleEnd)
    pub fn end_time(&self) -> DateTime<Utc> {
        self.header.planned_repeat_cycle_end
    }

    fn require_channel(&self, channel: Channel) -> NativeResult<()> {
        if self.channels.contains(channel) {
            Ok(())
        } else {
            Err(NativeError::ChannelNotAvailable(channel))
        }
    }

    /// Raw counts of one channel; HRV has three output lines per scan line
    pub fn read_counts(&self, channel: Channel) -> NativeResult<CountImage> {
        self.require_channel(channel)?;
        let chunk_lines = self.config.chunk_lines;
        if channel.is_hrv() {
            self.data.read_hrv(chunk_lines)
        } else {
            let slot = self
                .channels
                .visir_position(channel)
                .ok_or(NativeError::ChannelNotAvailable(channel))?;
            self.data.read_visir(slot, chunk_lines)
        }
    }

    /// Decode and calibrate one channel
    pub fn get_dataset(
        &self,
        channel: Channel,
        calibration: CalibrationLevel,
    ) -> NativeResult<CalibratedDataset> {
        self.get_dataset_with(channel, calibration, &SeviriInversion::new(self.platform))
    }

    /// Decode and calibrate one channel with a caller-provided inversion
    pub fn get_dataset_with(
        &self,
        channel: Channel,
        calibration: CalibrationLevel,
        inversion: &dyn RadiometricInversion,
    ) -> NativeResult<CalibratedDataset> {
        self.require_channel(channel)?;
        if !channel.calibrations().contains(&calibration) {
            return Err(NativeError::Configuration(format!(
                "Calibration {} not available for {}",
                calibration, channel
            )));
        }

        let counts = self.read_counts(channel)?;
        let (lines, columns) = counts.dim();
        log::debug!("{}: {} x {} samples", channel, lines, columns);

        let tic = Instant::now();
        let processor = CalibrationProcessor::new(&self.header, channel, self.config.calib_mode)?;
        let data = processor.calibrate_with(mask_fill(&counts), calibration, inversion)?;
        log::debug!("Calibration time {:?}", tic.elapsed());

        Ok(CalibratedDataset {
            channel,
            calibration,
            data,
            attrs: self.dataset_attributes(channel, calibration),
        })
    }

    pub fn dataset_attributes(
        &self,
        channel: Channel,
        calibration: CalibrationLevel,
    ) -> DatasetAttributes {
        let projection = self.projection_parameters();
        DatasetAttributes {
            units: calibration.units().to_string(),
            wavelength: channel.wavelength(),
            standard_name: calibration.standard_name().to_string(),
            platform_name: self.platform_name(),
            sensor: "seviri".to_string(),
            orbital_parameters: OrbitalParameters {
                projection_longitude: projection.ssp_longitude,
                projection_latitude: 0.0,
                projection_altitude: projection.h,
            },
        }
    }

    pub fn geolocation(&self) -> GeolocationResolver<'_> {
        GeolocationResolver::new(&self.header, &self.trailer, self.layout.is_full_disk)
    }

    pub fn area_extent(&self, channel: Channel) -> NativeResult<AreaExtentKind> {
        self.geolocation().area_extent(channel)
    }

    /// Geolocated grid of a channel.
    ///
    /// Full disk HRV is a stack of the lower and upper windows.
    pub fn area_definition(&self, channel: Channel) -> NativeResult<Area> {
        self.require_channel(channel)?;
        let projection = self.projection_parameters();

        match self.area_extent(channel)? {
            AreaExtentKind::Single(extent) => {
                let (description, lines, columns) = if channel.is_hrv() {
                    (
                        "SEVIRI high resolution channel area",
                        self.layout.hrv_number_of_lines,
                        self.layout.hrv_columns,
                    )
                } else {
                    (
                        "SEVIRI low resolution channel area",
                        self.layout.number_of_lines,
                        self.layout.visir_columns,
                    )
                };
                Ok(Area::Single(AreaDefinition::new(
                    channel,
                    description,
                    projection,
                    lines,
                    columns,
                    extent,
                )))
            }
            AreaExtentKind::Split { upper, lower } => {
                let window = |description: &str, window: WindowExtent| -> NativeResult<AreaDefinition> {
                    // A zero count marks an unscanned window, a negative one a corrupt trailer
                    let size = |value: i64, what: &str| {
                        usize::try_from(value).map_err(|_| {
                            NativeError::InvalidFormat(format!(
                                "{} has {} {}",
                                description, value, what
                            ))
                        })
                    };
                    Ok(AreaDefinition::new(
                        channel,
                        description,
                        projection,
                        size(window.lines, "lines")?,
                        size(window.columns, "columns")?,
                        window.extent,
                    ))
                };
                let lower = window("SEVIRI high resolution channel, lower window", lower)?;
                let upper = window("SEVIRI high resolution channel, upper window", upper)?;
                Ok(Area::Stacked(vec![lower, upper]).squeeze())
            }
        }
    }
}
