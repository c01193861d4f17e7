//! Built-in classification tables
//!
//! Order matters everywhere in this file: group suggestions, the global parent
//! order, gates within a parent and candidates within a gate are all tried
//! first to last.

use super::CategoryRules;
use super::rules::{Candidate, Gate, Matcher};
use super::taxonomy::*;
use crate::Result;

use Candidate::{CatchAll, Checked};

// Whole-token match where any non-alphanumeric character, `_` included,
// separates tokens.
macro_rules! word {
    ($body:literal) => {
        concat!(r"(?:^|[^[:alnum:]])", $body, r"(?:$|[^[:alnum:]])")
    };
}

const FOREIGN: &str = word!(r"(danish|flemish|dutch|deutsch|german|french|truefrench|swedish|swesub|norwegian|nordic|italian|spanish|castellano|latino|russian|polish|nl\.?subbed|nl\.?sub|vostfr|multi\.?sub)");

pub(super) fn builtin() -> Result<CategoryRules> {
    let mut rules = CategoryRules::new();

    group_suggestions(&mut rules)?;
    tv(&mut rules)?;
    xxx(&mut rules)?;
    movies(&mut rules)?;
    console(&mut rules)?;
    pc(&mut rules)?;
    audio(&mut rules)?;
    books(&mut rules)?;

    Ok(rules)
}

fn group_suggestions(rules: &mut CategoryRules) -> Result<()> {
    rules.suggest(r"alt\.binaries\.(multimedia\.)?(tv|teevee|hdtv|tvseries|x264\.tv)\b", &[TV])?;
    rules.suggest(r"alt\.binaries\.(multimedia\.)?anime", &[TV_ANIME])?;
    rules.suggest(r"alt\.binaries\.(documentaries|docs)\b", &[TV_DOCUMENTARY, TV])?;
    rules.suggest(r"alt\.binaries\.(multimedia\.)?sports?\b", &[TV_SPORT, TV])?;
    rules.suggest(
        r"alt\.binaries\.(movies|dvd|hdmovies|bluray|x264|divx|moovee)",
        &[MOVIES],
    )?;
    rules.suggest(r"alt\.binaries\.(erotica|xxx|sex|porn|pictures\.erotica)", &[XXX])?;
    rules.suggest(r"alt\.binaries\.(sounds|mp3|music|audio)", &[AUDIO])?;
    rules.suggest(r"alt\.binaries\.(audiobooks?|audio\.books?)", &[AUDIO_AUDIOBOOK])?;
    rules.suggest(r"alt\.binaries\.(e-?books?|ebook|comics|magazines)", &[BOOKS])?;
    rules.suggest(r"alt\.binaries\.(mac|apple|ipod|iphone)", &[PC_MAC, PC])?;
    rules.suggest(r"alt\.binaries\.(cd\.image|warez|0day|apps|iso|pc)", &[PC])?;
    rules.suggest(
        r"alt\.binaries\.(games|console|xbox|wii|nintendo|ps3|sony)",
        &[CONSOLE, PC],
    )?;
    Ok(())
}

fn tv(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(TV_FOREIGN, vec![Matcher::pattern(FOREIGN)?]);
    rules.leaf(
        TV_SPORT,
        vec![Matcher::pattern(
            word!(r"(epl|motogp|bellator|supercup|wtcc|bundesliga|uefa|espn|wwe|wwf|nba|nfl|nhl|mlb|ncaa|formula[ ._-]?1|ufc|premier[ ._-]league)"),
        )?],
    );
    rules.leaf(
        TV_DOCUMENTARY,
        vec![Matcher::pattern(
            word!(r"(documentar(y|ies)|docu|national[ ._-]geographic|natgeo|history[ ._-]channel)"),
        )?],
    );
    rules.leaf(
        TV_HD,
        vec![Matcher::pattern(
            word!(r"(720p|1080p|1080i|2160p|x264|h\.?264|x265|h\.?265|hevc|web-?dl)"),
        )?],
    );
    rules.leaf(
        TV_SD,
        vec![Matcher::pattern(word!(r"(sdtv|pdtv|dsr|dvdrip|xvid|divx|480p|576p)"))?],
    );

    rules.gate(
        TV,
        Gate::new(
            concat!(
                word!(r"(S\d{1,2}[ ._-]?E\d{1,3}|S\d{1,2}|\d{1,2}x\d{2,3}|(19|20)\d{2}[ ._-]\d{2}[ ._-]\d{2}|ep(isode)?[ ._-]?\d{1,3}|hdtv|pdtv|sdtv|dsr)"),
                r"|(?:^|[^[:alnum:]])season[ ._-]?\d",
            ),
            vec![
                Checked(TV_FOREIGN),
                Checked(TV_SPORT),
                Checked(TV_DOCUMENTARY),
                Checked(TV_HD),
                Checked(TV_SD),
                CatchAll(TV_OTHER),
            ],
        )?,
    );
    Ok(())
}

fn xxx(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(
        XXX_IMAGESET,
        vec![Matcher::pattern(word!(r"(imageset|image[ ._-]set|photo[ ._-]?set|pics?)"))?],
    );
    rules.leaf(
        XXX_X264,
        vec![Matcher::pattern(word!(r"(x264|h\.?264|720p|1080p|2160p|web-?dl)"))?],
    );
    rules.leaf(XXX_DVD, vec![Matcher::pattern(word!(r"(dvdr|dvd5|dvd9|dvd)"))?]);
    rules.leaf(XXX_WMV, vec![Matcher::pattern(word!(r"(wmv)"))?]);
    rules.leaf(XXX_XVID, vec![Matcher::pattern(word!(r"(xvid|divx)"))?]);

    rules.gate(
        XXX,
        Gate::new(
            word!(r"(xxx|porn|erotica?|nude|naked|playboy|penthouse|brazzers|naughty|milf|hardcore)"),
            vec![
                Checked(XXX_IMAGESET),
                Checked(XXX_X264),
                Checked(XXX_DVD),
                Checked(XXX_WMV),
                Checked(XXX_XVID),
                CatchAll(XXX_OTHER),
            ],
        )?,
    );
    Ok(())
}

fn movies(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(MOVIES_FOREIGN, vec![Matcher::pattern(FOREIGN)?]);
    rules.leaf(
        MOVIES_3D,
        vec![Matcher::pattern(word!(r"(3d|half[ ._-]?(sbs|ou)|h[ ._-]?sbs)"))?],
    );
    rules.leaf(
        MOVIES_BLURAY,
        vec![
            Matcher::pattern(word!(r"(bd[ ._-]?(25|50)|complete[ ._-]bluray|avc|remux)"))?,
            Matcher::all(&[(word!(r"(blu-?ray)"), true), (word!(r"(x264|x265|xvid|rip)"), false)])?,
        ],
    );
    rules.leaf(
        MOVIES_HD,
        vec![Matcher::pattern(
            word!(r"(720p|1080p|2160p|x264|x265|h\.?264|hevc|bdrip|brrip|web-?dl)"),
        )?],
    );
    rules.leaf(
        MOVIES_SD,
        vec![Matcher::pattern(
            word!(r"(dvdrip|dvdscr|xvid|divx|dvdr|dvd5|dvd9|r5|telesync|ts|cam|480p)"),
        )?],
    );

    rules.gate(
        MOVIES,
        Gate::new(
            concat!(
                r"[-._ ](19|20)\d{2}[-._ )]|",
                word!(r"(dvdrip|bdrip|brrip|blu-?ray|xvid|divx|dvdr|dvd5|dvd9|x264|1080p|720p|remux|dvdscr|telesync)"),
            ),
            vec![
                Checked(MOVIES_FOREIGN),
                Checked(MOVIES_3D),
                Checked(MOVIES_BLURAY),
                Checked(MOVIES_HD),
                Checked(MOVIES_SD),
                CatchAll(MOVIES_OTHER),
            ],
        )?,
    );
    Ok(())
}

fn console(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(CONSOLE_NDS, vec![Matcher::pattern(word!(r"(nds|3ds)"))?]);
    rules.leaf(CONSOLE_PSP, vec![Matcher::pattern(word!(r"(psp|vita)"))?]);
    rules.leaf(CONSOLE_WII, vec![Matcher::pattern(word!(r"(wii|wiiu|wiiware|ngc)"))?]);
    rules.leaf(
        CONSOLE_XBOX360,
        vec![Matcher::pattern(word!(r"(x360|xbox[ ._-]?360|xbla)"))?],
    );
    rules.leaf(
        CONSOLE_XBOX,
        vec![Matcher::expect(word!(r"(xbox)"), true)?],
    );
    rules.leaf(CONSOLE_PS3, vec![Matcher::pattern(word!(r"(ps3)"))?]);

    rules.gate(
        CONSOLE,
        Gate::new(
            word!(r"(nds|3ds|psp|vita|wii|wiiu|wiiware|ngc|x360|xbox|xbla|ps2|ps3|ps4|nsw|switch)"),
            vec![
                Checked(CONSOLE_NDS),
                Checked(CONSOLE_PSP),
                Checked(CONSOLE_WII),
                Checked(CONSOLE_XBOX360),
                Checked(CONSOLE_XBOX),
                Checked(CONSOLE_PS3),
                CatchAll(CONSOLE_OTHER),
            ],
        )?,
    );
    Ok(())
}

fn pc(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(
        PC_MOBILE_IOS,
        vec![Matcher::pattern(word!(r"(ios|iphone|ipad|ipod)"))?],
    );
    rules.leaf(PC_MOBILE_ANDROID, vec![Matcher::pattern(word!(r"(android|apk)"))?]);
    rules.leaf(
        PC_MOBILE_OTHER,
        vec![Matcher::pattern(word!(r"(symbian|windows[ ._-]?mobile|blackberry)"))?],
    );
    rules.leaf(
        PC_MAC,
        vec![Matcher::pattern(word!(r"(mac|macos|macosx|osx|dmg)"))?],
    );
    rules.leaf(
        PC_GAMES,
        vec![Matcher::pattern(
            word!(r"(reloaded|skidrow|codex|plaza|flt|fairlight|razor1911|prophet|gog|steam[ ._-]?rip)"),
        )?],
    );
    rules.leaf(
        PC_ISO,
        vec![Matcher::all(&[(word!(r"(iso|rar|dvd|cd)"), true), (word!(r"(x264|xvid|720p|1080p)"), false)])?],
    );

    rules.gate(
        PC,
        Gate::new(
            word!(r"(win(dows)?|win(32|64)|x86|x64|mac|macos|macosx|osx|dmg|keygen|crack(ed)?|portable|incl[ ._-]?keymaker|apk|android|ios|ipad|iphone|0day|multilingual|v\d+\.\d+(\.\d+)?|iso)"),
            vec![
                Checked(PC_MOBILE_IOS),
                Checked(PC_MOBILE_ANDROID),
                Checked(PC_MOBILE_OTHER),
                Checked(PC_MAC),
                Checked(PC_GAMES),
                Checked(PC_ISO),
                CatchAll(PC_0DAY),
            ],
        )?,
    );
    Ok(())
}

fn audio(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(
        AUDIO_AUDIOBOOK,
        vec![Matcher::pattern(word!(r"(audio[ ._-]?books?|unabridged|abridged)"))?],
    );
    rules.leaf(
        AUDIO_LOSSLESS,
        vec![Matcher::pattern(word!(r"(flac|alac|ape|lossless|24bit|wav)"))?],
    );
    rules.leaf(
        AUDIO_VIDEO,
        vec![Matcher::pattern(word!(r"(mvid|music[ ._-]?video|concert|live[ ._-]at)"))?],
    );
    rules.leaf(
        AUDIO_MP3,
        vec![Matcher::pattern(word!(r"(mp3|\d{3}[ ._-]?kbps|vbr|cbr|v0|v2)"))?],
    );

    rules.gate(
        AUDIO,
        Gate::new(
            word!(r"(mp3|flac|alac|ape|ogg|aac|m4a|lossless|\d{3}[ ._-]?kbps|vbr|cbr|discography|album|cdda|mvid|audio[ ._-]?books?)"),
            vec![
                Checked(AUDIO_AUDIOBOOK),
                Checked(AUDIO_LOSSLESS),
                Checked(AUDIO_VIDEO),
                Checked(AUDIO_MP3),
                CatchAll(AUDIO_OTHER),
            ],
        )?,
    );
    Ok(())
}

fn books(rules: &mut CategoryRules) -> Result<()> {
    rules.leaf(
        BOOKS_COMICS,
        vec![Matcher::pattern(word!(r"(comics?|cbr|cbz|graphic[ ._-]novel)"))?],
    );
    rules.leaf(
        BOOKS_MAGAZINES,
        vec![Matcher::pattern(word!(r"(magazines?|mag|issue[ ._-]?\d+|vol[ ._-]?\d+[ ._-]no[ ._-]?\d+)"))?],
    );

    rules.gate(
        BOOKS,
        Gate::new(
            word!(r"(e-?books?|epub|mobi|pdf|azw3?|magazines?|comics?|cbr|cbz|retail)"),
            vec![
                Checked(BOOKS_COMICS),
                Checked(BOOKS_MAGAZINES),
                CatchAll(BOOKS_EBOOK),
            ],
        )?,
    );
    Ok(())
}
