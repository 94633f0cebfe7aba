//! Bilingual app name registry.
//!
//! Maps human-readable app names (Chinese display names, English names and
//! their spelling variants) to Android package identifiers. Lookups are exact
//! string matches against the alias table; every accepted variant must be
//! registered up front.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Registry construction errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Alias '{alias}' is claimed by both {existing} and {conflicting}")]
    ConflictingAlias {
        alias: String,
        existing: String,
        conflicting: String,
    },
}

/// A single (display name, package identifier) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    pub name: String,
    pub package: String,
}

/// Read-only alias table.
///
/// Many names may map to one package. Reverse lookup returns the first alias
/// registered for a package, so registration order is part of the contract.
#[derive(Debug, Clone, Default)]
pub struct AppRegistry {
    entries: Vec<AppEntry>,
    by_name: HashMap<String, usize>,
}

impl AppRegistry {
    /// Build a registry from `(name, package)` pairs in registration order.
    ///
    /// Repeating an identical pair is allowed and keeps the first position.
    /// Registering one alias for two different packages is an error.
    pub fn from_entries<I, N, P>(pairs: I) -> Result<Self, RegistryError>
    where
        I: IntoIterator<Item = (N, P)>,
        N: Into<String>,
        P: Into<String>,
    {
        let mut registry = Self::default();

        for (name, package) in pairs {
            let name = name.into();
            let package = package.into();

            if let Some(&idx) = registry.by_name.get(&name) {
                let existing = &registry.entries[idx].package;
                if *existing != package {
                    return Err(RegistryError::ConflictingAlias {
                        alias: name,
                        existing: existing.clone(),
                        conflicting: package,
                    });
                }
                continue;
            }

            registry.by_name.insert(name.clone(), registry.entries.len());
            registry.entries.push(AppEntry { name, package });
        }

        Ok(registry)
    }

    /// The process-wide built-in registry.
    pub fn builtin() -> Arc<AppRegistry> {
        Arc::clone(&BUILTIN_REGISTRY)
    }

    /// Resolve an app name to its package identifier.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_name
            .get(name)
            .map(|&idx| self.entries[idx].package.as_str())
    }

    /// Find the first registered alias for a package identifier.
    pub fn reverse(&self, package: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.package == package)
            .map(|entry| entry.name.as_str())
    }

    /// All registered aliases in registration order.
    pub fn known_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn entries(&self) -> &[AppEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static BUILTIN_REGISTRY: Lazy<Arc<AppRegistry>> = Lazy::new(|| {
    Arc::new(
        AppRegistry::from_entries(BUILTIN_APPS.iter().copied())
            .expect("built-in app table contains a conflicting alias"),
    )
});

/// Built-in alias table, in registration order.
pub static BUILTIN_APPS: &[(&str, &str)] = &[
    // Social & Messaging
    ("微信", "com.tencent.mm"),
    ("QQ", "com.tencent.mobileqq"),
    ("微博", "com.sina.weibo"),

    // E-commerce
    ("淘宝", "com.taobao.taobao"),
    ("京东", "com.jingdong.app.mall"),
    ("拼多多", "com.xunmeng.pinduoduo"),
    ("淘宝闪购", "com.taobao.taobao"),
    ("京东秒送", "com.jingdong.app.mall"),

    // Lifestyle & Social
    ("小红书", "com.xingin.xhs"),
    ("豆瓣", "com.douban.frodo"),
    ("知乎", "com.zhihu.android"),

    // Maps & Navigation
    ("高德地图", "com.autonavi.minimap"),
    ("百度地图", "com.baidu.BaiduMap"),

    // Food & Services
    ("美团", "com.sankuai.meituan"),
    ("大众点评", "com.dianping.v1"),
    ("饿了么", "me.ele"),
    ("肯德基", "com.yek.android.kfc.activitys"),

    // Travel
    ("携程", "ctrip.android.view"),
    ("铁路12306", "com.MobileTicket"),
    ("12306", "com.MobileTicket"),
    ("去哪儿", "com.Qunar"),
    ("去哪儿旅行", "com.Qunar"),
    ("滴滴出行", "com.sdu.did.psnger"),

    // Video & Entertainment
    ("bilibili", "tv.danmaku.bili"),
    ("抖音", "com.ss.android.ugc.aweme"),
    ("快手", "com.smile.gifmaker"),
    ("腾讯视频", "com.tencent.qqlive"),
    ("爱奇艺", "com.qiyi.video"),
    ("优酷视频", "com.youku.phone"),
    ("芒果TV", "com.hunantv.imgo.activity"),
    ("红果短剧", "com.phoenix.read"),

    // Music & Audio
    ("网易云音乐", "com.netease.cloudmusic"),
    ("QQ音乐", "com.tencent.qqmusic"),
    ("汽水音乐", "com.luna.music"),
    ("喜马拉雅", "com.ximalaya.ting.android"),

    // Reading
    ("番茄小说", "com.dragon.read"),
    ("番茄免费小说", "com.dragon.read"),
    ("七猫免费小说", "com.kmxs.reader"),

    // Productivity
    ("飞书", "com.ss.android.lark"),
    ("QQ邮箱", "com.tencent.androidqqmail"),

    // AI & Tools
    ("豆包", "com.larus.nova"),

    // Health & Fitness
    ("keep", "com.gotokeep.keep"),
    ("美柚", "com.lingan.seeyou"),

    // News & Information
    ("腾讯新闻", "com.tencent.news"),
    ("今日头条", "com.ss.android.article.news"),

    // Real Estate
    ("贝壳找房", "com.lianjia.beike"),
    ("安居客", "com.anjuke.android.app"),

    // Finance
    ("同花顺", "com.hexin.plat.android"),

    // Games
    ("星穹铁道", "com.miHoYo.hkrpg"),
    ("崩坏：星穹铁道", "com.miHoYo.hkrpg"),
    ("恋与深空", "com.papegames.lysk.cn"),

    // System and Common Apps
    ("AndroidSystemSettings", "com.android.settings"),
    ("Android System Settings", "com.android.settings"),
    ("Android  System Settings", "com.android.settings"),
    ("Android-System-Settings", "com.android.settings"),
    ("Settings", "com.android.settings"),
    ("AudioRecorder", "com.android.soundrecorder"),
    ("audiorecorder", "com.android.soundrecorder"),

    // International Apps - Finance & Productivity
    ("Bluecoins", "com.rammigsoftware.bluecoins"),
    ("bluecoins", "com.rammigsoftware.bluecoins"),
    ("Broccoli", "com.flauschcode.broccoli"),
    ("broccoli", "com.flauschcode.broccoli"),

    // International Apps - Travel & Booking
    ("Booking.com", "com.booking"),
    ("Booking", "com.booking"),
    ("booking.com", "com.booking"),
    ("booking", "com.booking"),
    ("BOOKING.COM", "com.booking"),
    ("Expedia", "com.expedia.bookings"),
    ("expedia", "com.expedia.bookings"),
    ("Trip.com", "ctrip.english"),
    ("trip.com", "ctrip.english"),

    // International Apps - Browsers & Tools
    ("Chrome", "com.android.chrome"),
    ("chrome", "com.android.chrome"),
    ("Google Chrome", "com.android.chrome"),
    ("Clock", "com.android.deskclock"),
    ("clock", "com.android.deskclock"),
    ("Contacts", "com.android.contacts"),
    ("contacts", "com.android.contacts"),

    // International Apps - Education & Learning
    ("Duolingo", "com.duolingo"),
    ("duolingo", "com.duolingo"),

    // International Apps - Files & Storage
    ("Files", "com.android.fileexplorer"),
    ("files", "com.android.fileexplorer"),
    ("File Manager", "com.android.fileexplorer"),
    ("file manager", "com.android.fileexplorer"),

    // International Apps - Email & Communication (Google)
    ("gmail", "com.google.android.gm"),
    ("Gmail", "com.google.android.gm"),
    ("GoogleMail", "com.google.android.gm"),
    ("Google Mail", "com.google.android.gm"),
    ("GoogleFiles", "com.google.android.apps.nbu.files"),
    ("googlefiles", "com.google.android.apps.nbu.files"),
    ("FilesbyGoogle", "com.google.android.apps.nbu.files"),
    ("Files by Google", "com.google.android.apps.nbu.files"),
    ("GoogleCalendar", "com.google.android.calendar"),
    ("Google-Calendar", "com.google.android.calendar"),
    ("Google Calendar", "com.google.android.calendar"),
    ("google-calendar", "com.google.android.calendar"),
    ("google calendar", "com.google.android.calendar"),
    ("GoogleChat", "com.google.android.apps.dynamite"),
    ("Google Chat", "com.google.android.apps.dynamite"),
    ("Google-Chat", "com.google.android.apps.dynamite"),
    ("GoogleClock", "com.google.android.deskclock"),
    ("Google Clock", "com.google.android.deskclock"),
    ("Google-Clock", "com.google.android.deskclock"),
    ("GoogleContacts", "com.google.android.contacts"),
    ("Google-Contacts", "com.google.android.contacts"),
    ("Google Contacts", "com.google.android.contacts"),
    ("google-contacts", "com.google.android.contacts"),
    ("google contacts", "com.google.android.contacts"),
    ("GoogleDocs", "com.google.android.apps.docs.editors.docs"),
    ("Google Docs", "com.google.android.apps.docs.editors.docs"),
    ("googledocs", "com.google.android.apps.docs.editors.docs"),
    ("google docs", "com.google.android.apps.docs.editors.docs"),
    ("Google Drive", "com.google.android.apps.docs"),
    ("Google-Drive", "com.google.android.apps.docs"),
    ("google drive", "com.google.android.apps.docs"),
    ("google-drive", "com.google.android.apps.docs"),
    ("GoogleDrive", "com.google.android.apps.docs"),
    ("Googledrive", "com.google.android.apps.docs"),
    ("googledrive", "com.google.android.apps.docs"),
    ("GoogleFit", "com.google.android.apps.fitness"),
    ("googlefit", "com.google.android.apps.fitness"),
    ("Google Fit", "com.google.android.apps.fitness"),
    ("GoogleKeep", "com.google.android.keep"),
    ("googlekeep", "com.google.android.keep"),
    ("Google Keep", "com.google.android.keep"),
    ("GoogleMaps", "com.google.android.apps.maps"),
    ("Google Maps", "com.google.android.apps.maps"),
    ("googlemaps", "com.google.android.apps.maps"),
    ("google maps", "com.google.android.apps.maps"),
    ("Google Play Books", "com.google.android.apps.books"),
    ("Google-Play-Books", "com.google.android.apps.books"),
    ("google play books", "com.google.android.apps.books"),
    ("google-play-books", "com.google.android.apps.books"),
    ("GooglePlayBooks", "com.google.android.apps.books"),
    ("googleplaybooks", "com.google.android.apps.books"),
    ("GooglePlayStore", "com.android.vending"),
    ("Google Play Store", "com.android.vending"),
    ("Google-Play-Store", "com.android.vending"),
    ("Play Store", "com.android.vending"),
    ("GoogleSlides", "com.google.android.apps.docs.editors.slides"),
    ("Google Slides", "com.google.android.apps.docs.editors.slides"),
    ("Google-Slides", "com.google.android.apps.docs.editors.slides"),
    ("GoogleTasks", "com.google.android.apps.tasks"),
    ("Google Tasks", "com.google.android.apps.tasks"),
    ("Google-Tasks", "com.google.android.apps.tasks"),

    // International Apps - Notes & Organization
    ("Joplin", "net.cozic.joplin"),
    ("joplin", "net.cozic.joplin"),

    // International Apps - Food & Services
    ("McDonald", "com.mcdonalds.app"),
    ("mcdonald", "com.mcdonalds.app"),
    ("McDonalds", "com.mcdonalds.app"),
    ("McDonald's", "com.mcdonalds.app"),

    // International Apps - Navigation & Maps
    ("Osmand", "net.osmand"),
    ("osmand", "net.osmand"),
    ("OsmAnd", "net.osmand"),
    ("OpenTracks", "de.dennisguse.opentracks"),
    ("opentracks", "de.dennisguse.opentracks"),

    // International Apps - Music & Media
    ("PiMusicPlayer", "com.Project100Pi.themusicplayer"),
    ("pimusicplayer", "com.Project100Pi.themusicplayer"),
    ("RetroMusic", "code.name.monkey.retromusic"),
    ("retromusic", "code.name.monkey.retromusic"),
    ("VLC", "org.videolan.vlc"),
    ("vlc", "org.videolan.vlc"),

    // International Apps - Social & Communication
    ("Quora", "com.quora.android"),
    ("quora", "com.quora.android"),
    ("Reddit", "com.reddit.frontpage"),
    ("reddit", "com.reddit.frontpage"),
    ("Telegram", "org.telegram.messenger"),
    ("telegram", "org.telegram.messenger"),
    ("Tiktok", "com.zhiliaoapp.musically"),
    ("tiktok", "com.zhiliaoapp.musically"),
    ("TikTok", "com.zhiliaoapp.musically"),
    ("Twitter", "com.twitter.android"),
    ("twitter", "com.twitter.android"),
    ("X", "com.twitter.android"),
    ("x", "com.twitter.android"),
    ("WeChat", "com.tencent.mm"),
    ("wechat", "com.tencent.mm"),
    ("Whatsapp", "com.whatsapp"),
    ("WhatsApp", "com.whatsapp"),
    ("whatsapp", "com.whatsapp"),
    ("Facebook", "com.facebook.katana"),
    ("facebook", "com.facebook.katana"),
    ("FacebookMessenger", "com.facebook.orca"),
    ("Facebook Messenger", "com.facebook.orca"),
    ("Messenger", "com.facebook.orca"),
    ("messenger", "com.facebook.orca"),
    ("Instagram", "com.instagram.android"),
    ("instagram", "com.instagram.android"),

    // International Apps - E-commerce & Shopping
    ("Amazon", "com.amazon.mShop.android.shopping"),
    ("amazon", "com.amazon.mShop.android.shopping"),
    ("Amazon Shopping", "com.amazon.mShop.android.shopping"),
    ("eBay", "com.ebay.mobile"),
    ("ebay", "com.ebay.mobile"),
    ("Ebay", "com.ebay.mobile"),
    ("temu", "com.einnovation.temu"),
    ("Temu", "com.einnovation.temu"),
    ("TEMU", "com.einnovation.temu"),

    // International Apps - Utilities
    ("SimpleSMSMessenger", "com.simplemobiletools.smsmessenger"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_builtin() {
        let registry = AppRegistry::builtin();
        assert_eq!(registry.resolve("微信"), Some("com.tencent.mm"));
        assert_eq!(registry.resolve("WeChat"), Some("com.tencent.mm"));
        assert_eq!(registry.resolve("Chrome"), Some("com.android.chrome"));
        assert_eq!(registry.resolve("NonExistent"), None);
    }

    #[test]
    fn test_resolve_is_exact_match() {
        let registry = AppRegistry::builtin();
        assert_eq!(registry.resolve("wechat"), Some("com.tencent.mm"));
        assert_eq!(registry.resolve("WECHAT"), None);
        assert_eq!(registry.resolve(" WeChat"), None);
    }

    #[test]
    fn test_builtin_table_has_no_conflicts() {
        assert!(AppRegistry::from_entries(BUILTIN_APPS.iter().copied()).is_ok());
        assert_eq!(AppRegistry::builtin().len(), BUILTIN_APPS.len());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let registry = AppRegistry::builtin();
        for name in registry.known_names() {
            let first = registry.resolve(name);
            assert!(first.is_some());
            assert_eq!(registry.resolve(name), first);
        }
    }

    #[test]
    fn test_reverse_returns_first_registered_alias() {
        let registry = AppRegistry::builtin();
        // "微信" is registered before "WeChat" and "wechat".
        assert_eq!(registry.reverse("com.tencent.mm"), Some("微信"));
        assert_eq!(registry.reverse("com.android.settings"), Some("AndroidSystemSettings"));
        assert_eq!(registry.reverse("com.example.missing"), None);
    }

    #[test]
    fn test_reverse_of_resolve_maps_to_same_package() {
        let registry = AppRegistry::builtin();
        for name in registry.known_names() {
            let package = registry.resolve(name).unwrap();
            let alias = registry.reverse(package).unwrap();
            assert_eq!(registry.resolve(alias), Some(package));
        }
    }

    #[test]
    fn test_known_names_in_registration_order() {
        let registry =
            AppRegistry::from_entries([("b", "pkg.one"), ("a", "pkg.two"), ("c", "pkg.one")])
                .unwrap();
        let names: Vec<&str> = registry.known_names().collect();
        assert_eq!(names, vec!["b", "a", "c"]);
        // Restartable.
        assert_eq!(registry.known_names().count(), 3);
        assert_eq!(registry.reverse("pkg.one"), Some("b"));
    }

    #[test]
    fn test_identical_duplicate_is_collapsed() {
        let registry =
            AppRegistry::from_entries([("Maps", "pkg.maps"), ("Other", "pkg.o"), ("Maps", "pkg.maps")])
                .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.known_names().collect::<Vec<_>>(), vec!["Maps", "Other"]);
    }

    #[test]
    fn test_conflicting_alias_is_rejected() {
        let err = AppRegistry::from_entries([("Maps", "pkg.google"), ("Maps", "pkg.osm")])
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ConflictingAlias {
                alias: "Maps".to_string(),
                existing: "pkg.google".to_string(),
                conflicting: "pkg.osm".to_string(),
            }
        );
    }
}
