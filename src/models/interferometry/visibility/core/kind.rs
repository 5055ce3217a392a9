/// Parameter types understood by the built-in model kinds.
pub mod param {
    pub const FLUX_WEIGHT: &str = "flux_weight";
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const DIAMETER: &str = "diameter";
    pub const WIDTH: &str = "width";
    pub const FWHM: &str = "fwhm";
    pub const MINOR_AXIS_DIAMETER: &str = "minor_axis_diameter";
    pub const MAJOR_AXIS_DIAMETER: &str = "major_axis_diameter";
    pub const MINOR_INTERNAL_DIAMETER: &str = "minor_internal_diameter";
    pub const MAJOR_INTERNAL_DIAMETER: &str = "major_internal_diameter";
    pub const MINOR_AXIS_FWHM: &str = "minor_axis_fwhm";
    pub const MAJOR_AXIS_FWHM: &str = "major_axis_fwhm";
    pub const ELONG_RATIO: &str = "elong_ratio";
    pub const FLATTEN_RATIO: &str = "flatten_ratio";
    pub const MAJOR_AXIS_POS_ANGLE: &str = "major_axis_pos_angle";
    pub const MINOR_AXIS_POS_ANGLE: &str = "minor_axis_pos_angle";
    pub const A1_COEFF: &str = "a1_coeff";
    pub const A2_COEFF: &str = "a2_coeff";
}

const MAS: &str = "mas";
const DEG: &str = "deg";

/// Declaration of one parameter of a model kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    pub param_type: &'static str,
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub units: &'static str,
}

impl ParamSpec {
    const fn new(param_type: &'static str, default: f64, units: &'static str) -> Self {
        Self {
            param_type,
            default,
            min: None,
            max: None,
            units,
        }
    }

    const fn at_least(self, min: f64) -> Self {
        Self {
            min: Some(min),
            ..self
        }
    }

    const fn at_most(self, max: f64) -> Self {
        Self {
            max: Some(max),
            ..self
        }
    }

    const fn size(param_type: &'static str) -> Self {
        Self::new(param_type, 0.0, MAS).at_least(0.0)
    }

    const fn ratio(param_type: &'static str) -> Self {
        Self::new(param_type, 1.0, "").at_least(1.0)
    }

    const fn pos_angle(param_type: &'static str) -> Self {
        Self::new(param_type, 0.0, DEG).at_least(0.0).at_most(180.0)
    }
}

const FLUX_WEIGHT: ParamSpec = ParamSpec::new(param::FLUX_WEIGHT, 1.0, "").at_least(0.0);
const X: ParamSpec = ParamSpec::new(param::X, 0.0, MAS);
const Y: ParamSpec = ParamSpec::new(param::Y, 0.0, MAS);

const DIAMETER: ParamSpec = ParamSpec::size(param::DIAMETER);
const WIDTH: ParamSpec = ParamSpec::size(param::WIDTH);
const FWHM: ParamSpec = ParamSpec::size(param::FWHM);
const ELONG_RATIO: ParamSpec = ParamSpec::ratio(param::ELONG_RATIO);
const FLATTEN_RATIO: ParamSpec = ParamSpec::ratio(param::FLATTEN_RATIO);
const MAJOR_AXIS_POS_ANGLE: ParamSpec = ParamSpec::pos_angle(param::MAJOR_AXIS_POS_ANGLE);
const MINOR_AXIS_POS_ANGLE: ParamSpec = ParamSpec::pos_angle(param::MINOR_AXIS_POS_ANGLE);

const PUNCT: &[ParamSpec] = &[FLUX_WEIGHT, X, Y];
const DISK: &[ParamSpec] = &[FLUX_WEIGHT, X, Y, DIAMETER];
const ELONG_DISK: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    ParamSpec::size(param::MINOR_AXIS_DIAMETER),
    ELONG_RATIO,
    MAJOR_AXIS_POS_ANGLE,
];
const FLATTEN_DISK: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    ParamSpec::size(param::MAJOR_AXIS_DIAMETER),
    FLATTEN_RATIO,
    MINOR_AXIS_POS_ANGLE,
];
const RING: &[ParamSpec] = &[FLUX_WEIGHT, X, Y, DIAMETER, WIDTH];
const ELONG_RING: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    ParamSpec::size(param::MINOR_INTERNAL_DIAMETER),
    ELONG_RATIO,
    WIDTH,
    MAJOR_AXIS_POS_ANGLE,
];
const FLATTEN_RING: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    ParamSpec::size(param::MAJOR_INTERNAL_DIAMETER),
    FLATTEN_RATIO,
    WIDTH,
    MINOR_AXIS_POS_ANGLE,
];
const GAUSSIAN: &[ParamSpec] = &[FLUX_WEIGHT, X, Y, FWHM];
const ELONG_GAUSSIAN: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    ParamSpec::size(param::MINOR_AXIS_FWHM),
    ELONG_RATIO,
    MAJOR_AXIS_POS_ANGLE,
];
const FLATTEN_GAUSSIAN: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    ParamSpec::size(param::MAJOR_AXIS_FWHM),
    FLATTEN_RATIO,
    MINOR_AXIS_POS_ANGLE,
];
const LIMB_QUADRATIC: &[ParamSpec] = &[
    FLUX_WEIGHT,
    X,
    Y,
    DIAMETER,
    ParamSpec::new(param::A1_COEFF, 0.0, ""),
    ParamSpec::new(param::A2_COEFF, 0.0, ""),
];

/// The closed set of analytic source models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    Punct,
    Disk,
    ElongDisk,
    FlattenDisk,
    Circle,
    Ring,
    ElongRing,
    FlattenRing,
    Gaussian,
    ElongGaussian,
    FlattenGaussian,
    LimbQuadratic,
}

impl ModelKind {
    pub const ALL: [Self; 12] = [
        Self::Punct,
        Self::Disk,
        Self::ElongDisk,
        Self::FlattenDisk,
        Self::Circle,
        Self::Ring,
        Self::ElongRing,
        Self::FlattenRing,
        Self::Gaussian,
        Self::ElongGaussian,
        Self::FlattenGaussian,
        Self::LimbQuadratic,
    ];

    /// Identifier the kind is registered under by default.
    #[must_use]
    pub fn type_name(self) -> &'static str {
        match self {
            Self::Punct => "punct",
            Self::Disk => "disk",
            Self::ElongDisk => "elong_disk",
            Self::FlattenDisk => "flatten_disk",
            Self::Circle => "circle",
            Self::Ring => "ring",
            Self::ElongRing => "elong_ring",
            Self::FlattenRing => "flatten_ring",
            Self::Gaussian => "gaussian",
            Self::ElongGaussian => "elong_gaussian",
            Self::FlattenGaussian => "flatten_gaussian",
            Self::LimbQuadratic => "limb_quadratic",
        }
    }

    #[must_use]
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.type_name() == name)
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Punct => "point source",
            Self::Disk => "uniform disk",
            Self::ElongDisk => "uniform disk stretched along its major axis",
            Self::FlattenDisk => "uniform disk compressed along its minor axis",
            Self::Circle => "infinitely thin ring",
            Self::Ring => "uniform ring of finite width",
            Self::ElongRing => "ring stretched along its major axis",
            Self::FlattenRing => "ring compressed along its minor axis",
            Self::Gaussian => "circular gaussian",
            Self::ElongGaussian => "gaussian stretched along its major axis",
            Self::FlattenGaussian => "gaussian compressed along its minor axis",
            Self::LimbQuadratic => "disk with quadratic limb darkening",
        }
    }

    /// Parameter declarations, in declaration (and validation) order.
    #[must_use]
    pub fn parameters(self) -> &'static [ParamSpec] {
        match self {
            Self::Punct => PUNCT,
            Self::Disk | Self::Circle => DISK,
            Self::ElongDisk => ELONG_DISK,
            Self::FlattenDisk => FLATTEN_DISK,
            Self::Ring => RING,
            Self::ElongRing => ELONG_RING,
            Self::FlattenRing => FLATTEN_RING,
            Self::Gaussian => GAUSSIAN,
            Self::ElongGaussian => ELONG_GAUSSIAN,
            Self::FlattenGaussian => FLATTEN_GAUSSIAN,
            Self::LimbQuadratic => LIMB_QUADRATIC,
        }
    }

    #[must_use]
    pub fn parameter(self, param_type: &str) -> Option<&'static ParamSpec> {
        self.parameters()
            .iter()
            .find(|spec| spec.param_type == param_type)
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
