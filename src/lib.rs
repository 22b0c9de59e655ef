//! seviri-native: a fast reader for SEVIRI Level 1.5 native files
//!
//! Decodes the header, line records and trailer of a Meteosat Second
//! Generation native file, unpacks the 10-bit imagery, calibrates it to
//! radiance, reflectance or brightness temperature, and computes the
//! geostationary projection extent of every channel.

pub mod types;
pub mod config;
pub mod io;
pub mod core;

// Re-export main types and functions for easier access
pub use types::{
    AreaExtent, CalibratedDataset, CalibrationLevel, Channel, CountImage, DatasetAttributes,
    NativeError, NativeResult, Platform, ProjectionParameters, RealImage,
};
pub use config::{CalibrationMode, ReaderConfig};
pub use io::{ChannelSet, DataBlockView, FileHeader, LineLayout, NativeReader, Trailer};
pub use crate::core::{Area, AreaDefinition, AreaExtentKind, RadiometricInversion};

#[cfg(feature = "python")]
mod python {
    use crate::{Area, AreaExtent, AreaExtentKind, CalibrationLevel, Channel, NativeError};
    use crate::{CalibrationMode, NativeReader, ReaderConfig};
    use numpy::ToPyArray;
    use pyo3::exceptions::{
        PyKeyError, PyNotImplementedError, PyOSError, PyRuntimeError, PyValueError,
    };
    use pyo3::prelude::*;
    use pyo3::types::PyDict;

    fn to_py_err(e: NativeError) -> PyErr {
        match e {
            NativeError::Io(_) => PyOSError::new_err(e.to_string()),
            NativeError::InvalidFormat(_) | NativeError::Configuration(_) => {
                PyValueError::new_err(e.to_string())
            }
            NativeError::NotImplemented(_) => PyNotImplementedError::new_err(e.to_string()),
            NativeError::ChannelNotAvailable(_) => PyKeyError::new_err(e.to_string()),
            NativeError::Processing(_) => PyRuntimeError::new_err(e.to_string()),
        }
    }

    fn extent_tuple(extent: &AreaExtent) -> (f64, f64, f64, f64) {
        extent.as_tuple()
    }

    /// Python wrapper for NativeReader
    #[pyclass(name = "NativeReader")]
    struct PyNativeReader {
        inner: NativeReader,
    }

    #[pymethods]
    impl PyNativeReader {
        #[new]
        #[pyo3(signature = (path, calib_mode = "nominal"))]
        fn new(path: String, calib_mode: &str) -> PyResult<Self> {
            let mode: CalibrationMode = calib_mode.parse().map_err(to_py_err)?;
            let config = ReaderConfig::default().with_calib_mode(mode);
            let reader = NativeReader::with_config(&path, config).map_err(to_py_err)?;
            Ok(PyNativeReader { inner: reader })
        }

        #[getter]
        fn platform_name(&self) -> String {
            self.inner.platform_name()
        }

        #[getter]
        fn start_time(&self) -> String {
            self.inner.start_time().to_rfc3339()
        }

        #[getter]
        fn end_time(&self) -> String {
            self.inner.end_time().to_rfc3339()
        }

        #[getter]
        fn is_full_disk(&self) -> bool {
            self.inner.is_full_disk()
        }

        fn available_channels(&self) -> Vec<&'static str> {
            self.inner.channels().names()
        }

        fn get_dataset(
            &self,
            py: Python,
            channel: &str,
            calibration: &str,
        ) -> PyResult<PyObject> {
            let channel: Channel = channel.parse().map_err(to_py_err)?;
            let level: CalibrationLevel = calibration.parse().map_err(to_py_err)?;
            let dataset = self.inner.get_dataset(channel, level).map_err(to_py_err)?;

            let attrs = &dataset.attrs;
            let result = PyDict::new(py);
            result.set_item("data", dataset.data.to_pyarray(py))?;
            result.set_item("units", &attrs.units)?;
            result.set_item("wavelength", attrs.wavelength.to_vec())?;
            result.set_item("standard_name", &attrs.standard_name)?;
            result.set_item("platform_name", &attrs.platform_name)?;
            result.set_item("sensor", &attrs.sensor)?;

            let orbital = PyDict::new(py);
            let params = &attrs.orbital_parameters;
            orbital.set_item("projection_longitude", params.projection_longitude)?;
            orbital.set_item("projection_latitude", params.projection_latitude)?;
            orbital.set_item("projection_altitude", params.projection_altitude)?;
            result.set_item("orbital_parameters", orbital)?;
            Ok(result.into())
        }

        /// Extent tuple, or for full disk HRV a dict with both windows
        fn area_extent(&self, py: Python, channel: &str) -> PyResult<PyObject> {
            let channel: Channel = channel.parse().map_err(to_py_err)?;
            match self.inner.area_extent(channel).map_err(to_py_err)? {
                AreaExtentKind::Single(extent) => Ok(extent_tuple(&extent).into_py(py)),
                AreaExtentKind::Split { upper, lower } => {
                    let result = PyDict::new(py);
                    result.set_item("upper", extent_tuple(&upper.extent))?;
                    result.set_item("lower", extent_tuple(&lower.extent))?;
                    result.set_item("upper_shape", (upper.lines, upper.columns))?;
                    result.set_item("lower_shape", (lower.lines, lower.columns))?;
                    Ok(result.into())
                }
            }
        }

        fn proj_string(&self, channel: &str) -> PyResult<String> {
            let channel: Channel = channel.parse().map_err(to_py_err)?;
            let area: Area = self.inner.area_definition(channel).map_err(to_py_err)?;
            area.definitions()
                .first()
                .map(|d| d.proj_string())
                .ok_or_else(|| PyRuntimeError::new_err("Empty area"))
        }

        fn __repr__(&self) -> String {
            format!(
                "NativeReader('{}', platform='{}')",
                self.inner.path().display(),
                self.inner.platform_name()
            )
        }
    }

    /// Python module definition
    #[pymodule]
    fn _core(_py: Python, m: &PyModule) -> PyResult<()> {
        m.add_class::<PyNativeReader>()?;
        Ok(())
    }
}
