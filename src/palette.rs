//! Fixed colour tables for NIL points and vehicle legends

use crate::models::VehicleType;

/// Diverging brown-to-teal ramp; zones are coloured by position after
/// sorting on aggregate volume, so the front of the ramp marks the quietest NILs.
pub const NIL_PALETTE: [&str; 86] = [
    "#580000", "#5d0500", "#681101", "#711b03", "#7b2406", "#832d09",
    "#8c350b", "#943d0f", "#9b4411", "#a34b14", "#ab5217", "#b25a19",
    "#b9601c", "#bf681e", "#c66f21", "#cc7522", "#d37b25", "#d98127",
    "#dd892f", "#e0913d", "#e2984a", "#e4a055", "#e6a760", "#e7ae6a",
    "#e9b573", "#ebbc7d", "#edc287", "#eec890", "#efcd99", "#f1d3a1",
    "#f2d8a7", "#f3ddae", "#f5e1b6", "#f6e5bc", "#f7eac1", "#f8edc7",
    "#f9f1cc", "#faf4d0", "#fbf6d3", "#fcf8d8", "#fdfbdb", "#fdfcdc",
    "#fdfddd", "#fefede", "#ffffe0", "#fdfedf", "#fcfdde", "#fbfcde",
    "#f9fbdd", "#f6fadd", "#f3f9dc", "#f0f6db", "#edf4da", "#e9f2d9",
    "#e3efd7", "#dfecd6", "#dae9d4", "#d4e6d2", "#cfe3d0", "#c9dfce",
    "#c1dbca", "#bbd7c8", "#b4d3c5", "#accfc2", "#a3cbbe", "#9cc7bc",
    "#92c2b8", "#88beb5", "#7dbab2", "#72b5af", "#63b1ab", "#53aca8",
    "#42a8a6", "#3ba1a0", "#389a99", "#359392", "#328c8b", "#2f8585",
    "#2c7e7e", "#287777", "#b53a37", "#bf681e", "#ffffe0", "#dfecd6",
    "#9cc7bc", "#f5e1b6",
];

/// Colour for the zone at `position` in the volume ordering.
/// Positions past the end of the palette wrap around.
pub fn zone_color(position: usize) -> &'static str {
    NIL_PALETTE[position % NIL_PALETTE.len()]
}

/// Line colour for a vehicle type on the trajectory map
pub fn vehicle_color(vehicle: VehicleType) -> &'static str {
    match vehicle {
        VehicleType::Car => "#FE2B2B",
        VehicleType::Bike => "#7EEFA1",
        VehicleType::Moped => "#84C9FF",
        VehicleType::Scooter => "#FFABAB",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_color_front_of_palette() {
        assert_eq!(zone_color(0), "#580000");
        assert_eq!(zone_color(85), "#f5e1b6");
    }

    #[test]
    fn test_zone_color_wraps() {
        assert_eq!(zone_color(86), zone_color(0));
        assert_eq!(zone_color(87), "#5d0500");
    }

    #[test]
    fn test_vehicle_colors() {
        assert_eq!(vehicle_color(VehicleType::Car), "#FE2B2B");
        assert_eq!(vehicle_color(VehicleType::Scooter), "#FFABAB");
    }
}
