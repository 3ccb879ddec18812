//! Built-in settings for Galaxy S2 class devices

use crate::{Category, SettingDescriptor, ValueDomain};

pub const CATEGORY_SCREEN: &str = "category_screen";
pub const CATEGORY_HAPTIC: &str = "category_haptic";
pub const CATEGORY_RADIO: &str = "category_radio";
pub const CATEGORY_DOCK: &str = "category_dock";

pub const KEY_MDNIE_MODE: &str = "mdnie_mode";
pub const KEY_MDNIE_SCENARIO: &str = "mdnie_scenario";
pub const KEY_MDNIE_NEGATIVE: &str = "mdnie_negative";
pub const KEY_MDNIE_OUTDOOR: &str = "mdnie_outdoor";
pub const KEY_TOUCHSCREEN_SENSITIVITY: &str = "touchscreen_sensitivity";
pub const KEY_VIBRATOR_INTENSITY: &str = "vibrator_intensity";
pub const KEY_HSPA: &str = "hspa";
pub const KEY_DOCK_AUDIO: &str = "dock_audio";

const MDNIE_MODE_PATH: &str = "/sys/class/mdnie/mdnie/mode";
const MDNIE_SCENARIO_PATH: &str = "/sys/class/mdnie/mdnie/scenario";
const MDNIE_NEGATIVE_PATH: &str = "/sys/class/mdnie/mdnie/negative";
const MDNIE_OUTDOOR_PATH: &str = "/sys/class/mdnie/mdnie/outdoor";
const TSP_THRESHOLD_PATH: &str = "/sys/class/sec/sec_touchscreen/tsp_threshold";
const VIBRATOR_PATH: &str = "/sys/vibrator/pwm_val";

const SERVICE_MODE_ACTION: &str = "com.cyanogenmod.SamsungServiceMode.EXECUTE";
const DOCK_ACTION: &str = "com.cyanogenmod.settings.SamsungDock";

/// Categories in display order
pub fn builtin_categories() -> Vec<Category> {
    vec![
        Category::new(CATEGORY_SCREEN, "Screen"),
        Category::new(CATEGORY_HAPTIC, "Haptic"),
        Category::new(CATEGORY_RADIO, "Radio"),
        Category::new(CATEGORY_DOCK, "Dock"),
    ]
}

fn choice(options: &[&str], default: &str) -> ValueDomain {
    ValueDomain::Choice {
        options: options.iter().map(|s| s.to_string()).collect(),
        default: default.to_string(),
    }
}

/// Settings in display order
pub fn builtin() -> Vec<SettingDescriptor> {
    vec![
        // Dynamic, Standard, Movie
        SettingDescriptor::control_file(
            KEY_MDNIE_MODE,
            CATEGORY_SCREEN,
            "mDNIe mode",
            choice(&["0", "1", "2"], "0"),
            MDNIE_MODE_PATH,
        ),
        // UI, Video, Video warm, Video cold, Camera, Navigation, Gallery
        SettingDescriptor::control_file(
            KEY_MDNIE_SCENARIO,
            CATEGORY_SCREEN,
            "mDNIe scenario",
            choice(&["0", "1", "2", "3", "4", "5", "6"], "0"),
            MDNIE_SCENARIO_PATH,
        ),
        SettingDescriptor::control_file(
            KEY_MDNIE_NEGATIVE,
            CATEGORY_SCREEN,
            "Negative mode",
            ValueDomain::Boolean { default: false },
            MDNIE_NEGATIVE_PATH,
        ),
        SettingDescriptor::control_file(
            KEY_MDNIE_OUTDOOR,
            CATEGORY_SCREEN,
            "Outdoor mode",
            ValueDomain::Boolean { default: false },
            MDNIE_OUTDOOR_PATH,
        ),
        SettingDescriptor::control_file(
            KEY_TOUCHSCREEN_SENSITIVITY,
            CATEGORY_SCREEN,
            "Touchscreen sensitivity",
            choice(&["30", "40", "50", "60", "70"], "50"),
            TSP_THRESHOLD_PATH,
        ),
        SettingDescriptor::control_file(
            KEY_VIBRATOR_INTENSITY,
            CATEGORY_HAPTIC,
            "Vibrator intensity",
            ValueDomain::Integer {
                min: 0,
                max: 100,
                default: 50,
            },
            VIBRATOR_PATH,
        ),
        // HSDPA+HSUPA, HSDPA only, UMTS only
        SettingDescriptor::broadcast(
            KEY_HSPA,
            CATEGORY_RADIO,
            "HSPA",
            choice(&["23", "21", "22"], "23"),
            SERVICE_MODE_ACTION,
            "sub_type",
        ),
        SettingDescriptor::broadcast(
            KEY_DOCK_AUDIO,
            CATEGORY_DOCK,
            "Dock audio",
            ValueDomain::Boolean { default: false },
            DOCK_ACTION,
            "data",
        ),
    ]
}
