//! The two-level category tree
//!
//! Ids follow the newznab numbering: a parent is a multiple of 1000 and its
//! leaves share the thousands digit.

use crate::types::CategoryId;

/// Console games
pub const CONSOLE: CategoryId = CategoryId(1000);
#[allow(missing_docs)]
pub const CONSOLE_NDS: CategoryId = CategoryId(1010);
#[allow(missing_docs)]
pub const CONSOLE_PSP: CategoryId = CategoryId(1020);
#[allow(missing_docs)]
pub const CONSOLE_WII: CategoryId = CategoryId(1030);
#[allow(missing_docs)]
pub const CONSOLE_XBOX: CategoryId = CategoryId(1040);
#[allow(missing_docs)]
pub const CONSOLE_XBOX360: CategoryId = CategoryId(1050);
#[allow(missing_docs)]
pub const CONSOLE_PS3: CategoryId = CategoryId(1080);
#[allow(missing_docs)]
pub const CONSOLE_OTHER: CategoryId = CategoryId(1090);

/// Movies
pub const MOVIES: CategoryId = CategoryId(2000);
#[allow(missing_docs)]
pub const MOVIES_FOREIGN: CategoryId = CategoryId(2010);
#[allow(missing_docs)]
pub const MOVIES_OTHER: CategoryId = CategoryId(2020);
#[allow(missing_docs)]
pub const MOVIES_SD: CategoryId = CategoryId(2030);
#[allow(missing_docs)]
pub const MOVIES_HD: CategoryId = CategoryId(2040);
#[allow(missing_docs)]
pub const MOVIES_BLURAY: CategoryId = CategoryId(2050);
#[allow(missing_docs)]
pub const MOVIES_3D: CategoryId = CategoryId(2060);

/// Music and other audio
pub const AUDIO: CategoryId = CategoryId(3000);
#[allow(missing_docs)]
pub const AUDIO_MP3: CategoryId = CategoryId(3010);
#[allow(missing_docs)]
pub const AUDIO_VIDEO: CategoryId = CategoryId(3020);
#[allow(missing_docs)]
pub const AUDIO_AUDIOBOOK: CategoryId = CategoryId(3030);
#[allow(missing_docs)]
pub const AUDIO_LOSSLESS: CategoryId = CategoryId(3040);
#[allow(missing_docs)]
pub const AUDIO_OTHER: CategoryId = CategoryId(3050);

/// PC software and games
pub const PC: CategoryId = CategoryId(4000);
#[allow(missing_docs)]
pub const PC_0DAY: CategoryId = CategoryId(4010);
#[allow(missing_docs)]
pub const PC_ISO: CategoryId = CategoryId(4020);
#[allow(missing_docs)]
pub const PC_MAC: CategoryId = CategoryId(4030);
#[allow(missing_docs)]
pub const PC_MOBILE_OTHER: CategoryId = CategoryId(4040);
#[allow(missing_docs)]
pub const PC_GAMES: CategoryId = CategoryId(4050);
#[allow(missing_docs)]
pub const PC_MOBILE_IOS: CategoryId = CategoryId(4060);
#[allow(missing_docs)]
pub const PC_MOBILE_ANDROID: CategoryId = CategoryId(4070);

/// Television
pub const TV: CategoryId = CategoryId(5000);
#[allow(missing_docs)]
pub const TV_FOREIGN: CategoryId = CategoryId(5020);
#[allow(missing_docs)]
pub const TV_SD: CategoryId = CategoryId(5030);
#[allow(missing_docs)]
pub const TV_HD: CategoryId = CategoryId(5040);
#[allow(missing_docs)]
pub const TV_OTHER: CategoryId = CategoryId(5050);
#[allow(missing_docs)]
pub const TV_SPORT: CategoryId = CategoryId(5060);
#[allow(missing_docs)]
pub const TV_ANIME: CategoryId = CategoryId(5070);
#[allow(missing_docs)]
pub const TV_DOCUMENTARY: CategoryId = CategoryId(5080);

/// Adult
pub const XXX: CategoryId = CategoryId(6000);
#[allow(missing_docs)]
pub const XXX_DVD: CategoryId = CategoryId(6010);
#[allow(missing_docs)]
pub const XXX_WMV: CategoryId = CategoryId(6020);
#[allow(missing_docs)]
pub const XXX_XVID: CategoryId = CategoryId(6030);
#[allow(missing_docs)]
pub const XXX_X264: CategoryId = CategoryId(6040);
#[allow(missing_docs)]
pub const XXX_OTHER: CategoryId = CategoryId(6050);
#[allow(missing_docs)]
pub const XXX_IMAGESET: CategoryId = CategoryId(6060);

/// Books, magazines and comics
pub const BOOKS: CategoryId = CategoryId(7000);
#[allow(missing_docs)]
pub const BOOKS_MAGAZINES: CategoryId = CategoryId(7010);
#[allow(missing_docs)]
pub const BOOKS_EBOOK: CategoryId = CategoryId(7020);
#[allow(missing_docs)]
pub const BOOKS_COMICS: CategoryId = CategoryId(7030);

/// Everything else
pub const MISC: CategoryId = CategoryId(8000);
/// The reserved fallback leaf
pub const MISC_OTHER: CategoryId = CategoryId(8010);

/// (id, name, parent) for every category, parents first
pub const CATEGORIES: &[(CategoryId, &str, Option<CategoryId>)] = &[
    (CONSOLE, "Console", None),
    (MOVIES, "Movies", None),
    (AUDIO, "Audio", None),
    (PC, "PC", None),
    (TV, "TV", None),
    (XXX, "XXX", None),
    (BOOKS, "Books", None),
    (MISC, "Misc", None),
    (CONSOLE_NDS, "NDS", Some(CONSOLE)),
    (CONSOLE_PSP, "PSP", Some(CONSOLE)),
    (CONSOLE_WII, "Wii", Some(CONSOLE)),
    (CONSOLE_XBOX, "Xbox", Some(CONSOLE)),
    (CONSOLE_XBOX360, "Xbox 360", Some(CONSOLE)),
    (CONSOLE_PS3, "PS3", Some(CONSOLE)),
    (CONSOLE_OTHER, "Other", Some(CONSOLE)),
    (MOVIES_FOREIGN, "Foreign", Some(MOVIES)),
    (MOVIES_OTHER, "Other", Some(MOVIES)),
    (MOVIES_SD, "SD", Some(MOVIES)),
    (MOVIES_HD, "HD", Some(MOVIES)),
    (MOVIES_BLURAY, "BluRay", Some(MOVIES)),
    (MOVIES_3D, "3D", Some(MOVIES)),
    (AUDIO_MP3, "MP3", Some(AUDIO)),
    (AUDIO_VIDEO, "Video", Some(AUDIO)),
    (AUDIO_AUDIOBOOK, "Audiobook", Some(AUDIO)),
    (AUDIO_LOSSLESS, "Lossless", Some(AUDIO)),
    (AUDIO_OTHER, "Other", Some(AUDIO)),
    (PC_0DAY, "0day", Some(PC)),
    (PC_ISO, "ISO", Some(PC)),
    (PC_MAC, "Mac", Some(PC)),
    (PC_MOBILE_OTHER, "Mobile-Other", Some(PC)),
    (PC_GAMES, "Games", Some(PC)),
    (PC_MOBILE_IOS, "Mobile-iOS", Some(PC)),
    (PC_MOBILE_ANDROID, "Mobile-Android", Some(PC)),
    (TV_FOREIGN, "Foreign", Some(TV)),
    (TV_SD, "SD", Some(TV)),
    (TV_HD, "HD", Some(TV)),
    (TV_OTHER, "Other", Some(TV)),
    (TV_SPORT, "Sport", Some(TV)),
    (TV_ANIME, "Anime", Some(TV)),
    (TV_DOCUMENTARY, "Documentary", Some(TV)),
    (XXX_DVD, "DVD", Some(XXX)),
    (XXX_WMV, "WMV", Some(XXX)),
    (XXX_XVID, "XviD", Some(XXX)),
    (XXX_X264, "x264", Some(XXX)),
    (XXX_OTHER, "Other", Some(XXX)),
    (XXX_IMAGESET, "ImageSet", Some(XXX)),
    (BOOKS_MAGAZINES, "Magazines", Some(BOOKS)),
    (BOOKS_EBOOK, "Ebook", Some(BOOKS)),
    (BOOKS_COMICS, "Comics", Some(BOOKS)),
    (MISC_OTHER, "Other", Some(MISC)),
];

/// Whether `id` is a top-level category
pub fn is_parent(id: CategoryId) -> bool {
    parent_of(id).is_none() && CATEGORIES.iter().any(|(c, _, _)| *c == id)
}

/// Parent of a leaf, `None` for parents and unknown ids
pub fn parent_of(id: CategoryId) -> Option<CategoryId> {
    CATEGORIES
        .iter()
        .find(|(c, _, _)| *c == id)
        .and_then(|(_, _, parent)| *parent)
}

/// Display name of a category ("TV > HD" for leaves)
pub fn display_name(id: CategoryId) -> Option<String> {
    let (_, name, parent) = CATEGORIES.iter().find(|(c, _, _)| *c == id)?;
    match parent {
        Some(parent) => {
            let (_, parent_name, _) = CATEGORIES.iter().find(|(c, _, _)| c == parent)?;
            Some(format!("{} > {}", parent_name, name))
        }
        None => Some((*name).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn tree_is_two_levels_deep() {
        for (id, _, parent) in CATEGORIES {
            if let Some(parent) = parent {
                assert!(is_parent(*parent), "{} has a non-parent parent", id);
                assert_eq!(parent.get() / 1000, id.get() / 1000, "{} misfiled", id);
            }
        }
    }

    #[test]
    fn ids_are_unique() {
        let ids: HashSet<_> = CATEGORIES.iter().map(|(id, _, _)| *id).collect();
        assert_eq!(ids.len(), CATEGORIES.len());
    }

    #[test]
    fn names_include_parent() {
        assert_eq!(display_name(TV_HD).as_deref(), Some("TV > HD"));
        assert_eq!(display_name(MISC).as_deref(), Some("Misc"));
        assert_eq!(display_name(CategoryId(42)), None);
        assert!(!is_parent(MISC_OTHER));
    }
}
