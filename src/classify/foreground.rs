use super::contains_ci;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Known launcher packages, used when the platform's home-intent resolution
/// fails or returns nothing.
static FALLBACK_LAUNCHERS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "com.android.launcher",
        "com.android.launcher2",
        "com.android.launcher3",
        "com.google.android.apps.nexuslauncher",
        "com.sec.android.app.launcher",
        "com.miui.home",
        "net.oneplus.launcher",
        "com.oneplus.launcher",
        "com.huawei.android.launcher",
        "com.oppo.launcher",
        "com.teslacoilsw.launcher",
        "com.microsoft.launcher",
    ]
    .into_iter()
    .collect()
});

pub(super) fn fallback_launcher_packages() -> HashSet<String> {
    FALLBACK_LAUNCHERS.iter().map(|p| p.to_string()).collect()
}

const RECENTS_HINTS: [&str; 3] = ["recents", "overview", "taskswitcher"];

/// Whether an activity class name names the task-switcher surface. The
/// package prefix is stripped first so a package like "com.recentsfan.app"
/// cannot trip the match.
pub fn is_recents_class(class_name: &str) -> bool {
    let short = class_name.rsplit('.').next().unwrap_or(class_name);
    RECENTS_HINTS.iter().any(|hint| contains_ci(short, hint))
}

/// Whether an activity class name is a wallpaper-preview surface.
pub fn is_wallpaper_preview_class(class_name: &str) -> bool {
    let short = class_name.rsplit('.').next().unwrap_or(class_name);
    contains_ci(short, "wallpaper")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recents_matches_after_prefix_strip() {
        assert!(is_recents_class("com.android.systemui.recents.RecentsActivity"));
        assert!(is_recents_class("com.android.quickstep.OverviewActivity"));
        assert!(is_recents_class("com.vendor.TaskSwitcherView"));
    }

    #[test]
    fn recents_ignores_package_segments() {
        assert!(!is_recents_class("com.recentsfan.app.MainActivity"));
        assert!(!is_recents_class("com.overview.dashboards.ChartActivity"));
    }

    #[test]
    fn recents_is_case_insensitive() {
        assert!(is_recents_class("com.vendor.RECENTSPanel"));
    }

    #[test]
    fn wallpaper_preview_matches_class_only() {
        assert!(is_wallpaper_preview_class(
            "com.android.wallpaper.picker.WallpaperPreviewActivity"
        ));
        assert!(!is_wallpaper_preview_class("com.wallpaper.store.CheckoutActivity"));
    }

    #[test]
    fn fallback_set_covers_stock_launchers() {
        let set = fallback_launcher_packages();
        assert!(set.contains("com.android.launcher3"));
        assert!(set.contains("com.google.android.apps.nexuslauncher"));
    }
}
