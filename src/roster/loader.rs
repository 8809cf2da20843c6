//! Roster CSV loading.
//!
//! Reads the practice-management export and hands raw rows to the index
//! builder. I/O and CSV-shape problems are hard errors; per-row data
//! problems are the index builder's business (skip and log).

use std::path::Path;

use tracing::info;

use crate::error::RosterError;
use crate::roster::model::RosterRow;

/// Load roster rows from a CSV export at `path`.
pub fn load_roster(path: &Path) -> Result<Vec<RosterRow>, RosterError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| match e.kind() {
            csv::ErrorKind::Io(_) => RosterError::Io {
                path: path.display().to_string(),
                source: std::io::Error::other(e.to_string()),
            },
            _ => RosterError::Csv(e),
        })?;

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: RosterRow = result?;
        rows.push(row);
    }

    // An empty roster would silently assign nothing all day; stop at
    // startup instead.
    if rows.is_empty() {
        return Err(RosterError::Empty {
            path: path.display().to_string(),
        });
    }

    info!(path = %path.display(), rows = rows.len(), "Loaded roster export");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn loads_well_formed_export() {
        let file = write_csv(
            "Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n\
             Ahmet Yılmaz - Asylum,Jane Roe,John Doe,123-456-789\n\
             Fatma Kaya - Bond,,John Doe,\n",
        );
        let rows = load_roster(file.path()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].case_name.as_deref(), Some("Ahmet Yılmaz - Asylum"));
        assert_eq!(rows[0].lead_attorney.as_deref(), Some("Jane Roe"));
        // Empty CSV fields deserialize as None
        assert_eq!(rows[1].lead_attorney, None);
        assert_eq!(rows[1].a_number, None);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_roster(Path::new("/nonexistent/cases.csv")).unwrap_err();
        assert!(matches!(err, RosterError::Io { .. }));
    }

    #[test]
    fn header_only_export_is_an_error() {
        let file = write_csv("Case/Matter Name,Lead Attorney,Originating Attorney,A Number\n");
        let err = load_roster(file.path()).unwrap_err();
        assert!(matches!(err, RosterError::Empty { .. }));
    }

    #[test]
    fn tolerates_extra_columns() {
        let file = write_csv(
            "Case/Matter Name,Lead Attorney,Originating Attorney,A Number,Practice Area\n\
             Ahmet Yılmaz - Asylum,Jane Roe,,,Defensive Asylum\n",
        );
        let rows = load_roster(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
    }
}
