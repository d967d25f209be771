//! Bus Manager Tests
//!
//! Named transports resolved through a `BusManager`, with one cached bus per
//! name.

mod routing;
mod support;
