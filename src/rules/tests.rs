use crate::api::{Context, ParsedListing, autodetect, builtin_server_types, parse_listing};
use crate::record::ListingItem;
use crate::rules::definitions;

const UNIX_LISTING: &str = "total 12
drwxr-xr-x   2 root     root         4096 Jan 31 12:00 src
-rw-r--r--   1 user     group        1234 Dec 31  2023 notes.txt
lrwxrwxrwx   1 root     root            7 Feb  1 10:00 lib -> usr/lib
crw-rw-rw-   1 root     root       1,   3 Jan  5  2020 null
-rw-------   1 ftp         42 Mar  3 09:15 .hidden
drwxr-xr-x   2 root     root         4096 Jan 10 08:00 .
";

const WINDOWS_LISTING: &str = "01-31-24  12:00PM       <DIR>          src\r
12-31-2023  11:59PM            1,234 notes.txt\r
";

const NETWARE_LISTING: &str = "total 0
d [RWCEAFMS] admin                512 Jan 31 12:00 SYS
- [RWCEAFMS] admin               1234 Dec 31  2023 notes.txt
";

fn summary(item: &ListingItem) -> String {
    let flags: String = [(item.is_dir, 'd'), (item.is_link, 'l'), (item.is_hidden, 'h')]
        .iter()
        .map(|(set, c)| if *set { *c } else { '-' })
        .collect();
    let last_write = item.last_write.map(|t| t.to_string()).unwrap_or_default();
    format!("{}|{}|{}|{}", item.name, flags, item.size, last_write)
}

fn summaries(listing: &ParsedListing) -> Vec<String> {
    listing.items.iter().map(summary).collect()
}

fn server_type(name: &str) -> &'static crate::api::ServerType {
    builtin_server_types().iter().find(|t| t.name() == name).unwrap()
}

#[test]
fn builtin_definitions_compile() {
    assert_eq!(builtin_server_types().len(), definitions().len());
    for server_type in builtin_server_types() {
        assert!(server_type.grammar().unassigned_columns().is_empty(), "{}", server_type.name());
    }
}

#[test]
fn builtin_listings_parse() {
    // Array of (expected item summaries, server type, listing)
    let cases: Vec<(Vec<&str>, &str, &str)> = vec![
        (
            vec![
                "src|d--|4096|2023-01-31 12:00:00",
                "notes.txt|---|1234|2023-12-31 00:00:00",
                "lib|dl-|7|2023-02-01 10:00:00",
                "null|---|0|2020-01-05 00:00:00",
                ".hidden|--h|42|2023-03-03 09:15:00",
            ],
            "UNIX",
            UNIX_LISTING,
        ),
        (
            vec!["src|d--|0|2024-01-31 12:00:00", "notes.txt|---|1234|2023-12-31 23:59:00"],
            "Windows (IIS/DOS)",
            WINDOWS_LISTING,
        ),
        (
            vec!["SYS|d--|512|2023-01-31 12:00:00", "notes.txt|---|1234|2023-12-31 00:00:00"],
            "NetWare",
            NETWARE_LISTING,
        ),
    ];

    let ctx = Context::default();
    for (expected, name, listing) in cases {
        let parsed = parse_listing(server_type(name), listing.as_bytes(), &ctx).unwrap();
        assert_eq!(summaries(&parsed), expected, "{name}");
    }
}

#[test]
fn unix_text_columns() {
    let parsed = parse_listing(server_type("UNIX"), UNIX_LISTING.as_bytes(), &Context::default()).unwrap();
    let lib = &parsed.items[2];
    let text: Vec<String> = lib.values[5..].iter().map(|v| v.to_string()).collect();
    assert_eq!(text, vec!["lrwxrwxrwx", "root", "root", "usr/lib"]);
    assert_eq!(parsed.items[1].extension(), Some("txt"));
    assert_eq!(parsed.items[1].values[1].to_string(), "txt");
}

#[test]
fn autodetection_picks_the_parsing_type() {
    // Array of (expected server type, welcome, syst, listing)
    let cases: Vec<(Option<&str>, &str, &str, &str)> = vec![
        (Some("UNIX"), "", "UNIX Type: L8", UNIX_LISTING),
        (Some("UNIX"), "", "", UNIX_LISTING),
        (Some("Windows (IIS/DOS)"), "", "", WINDOWS_LISTING),
        (Some("Windows (IIS/DOS)"), "220 Microsoft FTP Service", "UNIX Type: L8", WINDOWS_LISTING),
        (Some("NetWare"), "220 NetWare FTP server", "", NETWARE_LISTING),
        (Some("NetWare"), "", "", NETWARE_LISTING),
        (None, "", "", "this is not a listing\n"),
    ];

    let ctx = Context::default();
    for (expected, welcome, syst, listing) in cases {
        let detected = autodetect(builtin_server_types(), None, welcome, syst, listing.as_bytes(), &ctx)
            .unwrap()
            .map(|d| d.server_type.name().to_string());
        assert_eq!(detected.as_deref(), expected, "{welcome:?} {syst:?}");
    }
}
