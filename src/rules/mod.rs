//! Built-in server types.
//!
//! Each definition pairs an autodetection condition with the listing grammar
//! of one server family. They are compiled on first use.

#[cfg(test)]
mod tests;

use crate::api::{ServerType, ServerTypeDef};
use crate::columns::{Column, ColumnKind};
use once_cell::sync::Lazy;

pub(crate) static BUILTIN: Lazy<Vec<ServerType>> = Lazy::new(|| {
    definitions()
        .iter()
        .filter_map(|def| match ServerType::compile(def) {
            Ok(server_type) => Some(server_type),
            Err(err) => {
                tracing::error!(%err, "built-in server type does not compile");
                None
            }
        })
        .collect()
});

/// Definitions of the built-in server types, in autodetection order.
pub fn definitions() -> Vec<ServerTypeDef> {
    vec![unix(), windows(), netware()]
}

fn standard_columns() -> Vec<Column> {
    vec![
        Column::new("name", ColumnKind::Name),
        Column::new("ext", ColumnKind::Extension),
        Column::new("size", ColumnKind::Size),
        Column::new("date", ColumnKind::Date),
        Column::new("time", ColumnKind::Time),
    ]
}

/// Date, time and name after the size field of `ls -l` style entries.
const UNIX_TAIL: &str = "month_3(<date>), white_spaces(), day(<date>), white_spaces(),
  year_or_time(<date>, <time>), white_spaces(), assign(<is_hidden>, next_char == \".\")";

const UNIX_OWNER: &str = "all(<rights>, 10), white_spaces(), number(), white_spaces(),
  word(<user>), white_spaces(), word(<group>), white_spaces()";

fn unix() -> ServerTypeDef {
    let mut columns = standard_columns();
    columns.extend([
        Column::new("rights", ColumnKind::Text),
        Column::new("user", ColumnKind::Text),
        Column::new("group", ColumnKind::Text),
        Column::new("link", ColumnKind::Text),
    ]);
    let rules = format!(
        "# total 1234
* skip_white_spaces(), if(next_word eq \"total\"), word(), white_spaces(), number();
# blank lines
* skip_white_spaces();
# lrwxrwxrwx   1 root  root      7 Feb  1 10:00 lib -> usr/lib
* if(next_char eq \"l\"), assign(<is_link>, true), {UNIX_OWNER},
  number(<size>), white_spaces(), {UNIX_TAIL}, unix_link(<is_dir>, <name>, <link>);
# crw-rw-rw-   1 root  root   1,   3 Jan  5  2020 null
* if(next_char in \"bc\"), {UNIX_OWNER},
  unix_device(), white_spaces(), {UNIX_TAIL}, rest_of_line(<name>);
# drwxr-xr-x   2 root  root   4096 Jan 31 12:00 src
* assign(<is_dir>, next_char eq \"d\"), assign(<is_link>, next_char eq \"l\"), {UNIX_OWNER},
  number(<size>), white_spaces(), {UNIX_TAIL}, rest_of_line(<name>);
# -rw-r--r--   1 ftp        1234 Dec 31  2023 notes.txt
* assign(<is_dir>, next_char eq \"d\"), all(<rights>, 10), white_spaces(), number(),
  white_spaces(), word(<user>), white_spaces(),
  number(<size>), white_spaces(), {UNIX_TAIL}, rest_of_line(<name>);
"
    );
    ServerTypeDef {
        name: "UNIX".to_string(),
        autodetect: "syst_contains(\"UNIX\") or syst_contains(\"Linux\") or welcome_contains(\"vsFTPd\")".to_string(),
        columns,
        rules,
    }
}

fn windows() -> ServerTypeDef {
    let rules = "# blank lines
* skip_white_spaces();
# 01-31-24  12:00PM       <DIR>          src
* month(<date>), all(1), day(<date>), all(1), year(<date>), white_spaces(), time(<time>),
  white_spaces(), if(next_word eq \"<DIR>\"), assign(<is_dir>, true), word(), white_spaces(),
  rest_of_line(<name>);
# 12-31-2023  11:59PM            1,234 notes.txt
* month(<date>), all(1), day(<date>), all(1), year(<date>), white_spaces(), time(<time>),
  white_spaces(), number_with_separators(<size>, \",\"), white_spaces(), rest_of_line(<name>);
";
    ServerTypeDef {
        name: "Windows (IIS/DOS)".to_string(),
        autodetect: "syst_contains(\"Windows_NT\") or welcome_contains(\"Microsoft FTP\")".to_string(),
        columns: standard_columns(),
        rules: rules.to_string(),
    }
}

fn netware() -> ServerTypeDef {
    let mut columns = standard_columns();
    columns.extend([Column::new("rights", ColumnKind::Text), Column::new("owner", ColumnKind::Text)]);
    let rules = format!(
        "# total 0
* skip_white_spaces(), if(next_word eq \"total\"), word(), white_spaces(), number();
* skip_white_spaces();
# d [RWCEAFMS] admin                512 Jan 31 12:00 SYS
* assign(<is_dir>, next_char eq \"d\"), word(), white_spaces(), all_to(<rights>, \"]\"),
  white_spaces(), word(<owner>), white_spaces(), number(<size>), white_spaces(),
  {UNIX_TAIL}, rest_of_line(<name>);
"
    );
    ServerTypeDef {
        name: "NetWare".to_string(),
        autodetect: "welcome_contains(\"NetWare\") or syst_contains(\"NETWARE\")".to_string(),
        columns,
        rules,
    }
}
