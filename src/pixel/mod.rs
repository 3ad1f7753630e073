pub(crate) mod buffer;
pub(crate) mod colorspace;
pub(crate) mod raster;
