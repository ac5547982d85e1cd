use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// A 1-based page selection such as `1,3-5`.
///
/// Syntax is checked when parsing; bounds are checked against the document
/// in [`PageSelection::indices`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    ranges: Vec<RangeInclusive<usize>>,
}

fn page_number(s: &str) -> Result<usize, String> {
    let page: usize = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid page number: '{}'", s.trim()))?;
    if page == 0 {
        return Err("page 0 is invalid (pages start at 1)".to_string());
    }
    Ok(page)
}

impl FromStr for PageSelection {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let range = match part.split_once('-') {
                Some((start, end)) => {
                    let (start, end) = (page_number(start)?, page_number(end)?);
                    if end < start {
                        return Err(format!("descending page range: '{part}'"));
                    }
                    start..=end
                }
                None => {
                    let page = page_number(part)?;
                    page..=page
                }
            };
            ranges.push(range);
        }
        if ranges.is_empty() {
            return Err("empty page range".to_string());
        }
        Ok(Self { ranges })
    }
}

impl fmt::Display for PageSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .ranges
            .iter()
            .map(|r| {
                if r.start() == r.end() {
                    r.start().to_string()
                } else {
                    format!("{}-{}", r.start(), r.end())
                }
            })
            .collect();
        write!(f, "{}", parts.join(","))
    }
}

impl PageSelection {
    /// Sorted, de-duplicated 0-based page indices.
    pub fn indices(&self, page_count: usize) -> Result<Vec<usize>, String> {
        let last = self.ranges.iter().map(|r| *r.end()).max().unwrap_or(0);
        if last > page_count {
            return Err(format!(
                "page {last} exceeds document page count ({page_count})"
            ));
        }
        let mut pages: Vec<usize> = self
            .ranges
            .iter()
            .flat_map(|r| r.clone().map(|p| p - 1))
            .collect();
        pages.sort_unstable();
        pages.dedup();
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(input: &str, count: usize) -> Result<Vec<usize>, String> {
        input.parse::<PageSelection>()?.indices(count)
    }

    #[test]
    fn singles_and_ranges() {
        assert_eq!(indices("3", 5).unwrap(), vec![2]);
        assert_eq!(indices("2-4", 5).unwrap(), vec![1, 2, 3]);
        assert_eq!(
            indices("1-3,7,10-12", 12).unwrap(),
            vec![0, 1, 2, 6, 9, 10, 11]
        );
    }

    #[test]
    fn overlapping_ranges_are_deduplicated() {
        assert_eq!(indices("3,1-3,2", 5).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn whitespace_tolerated() {
        assert_eq!(indices(" 1 , 3 - 5 ", 5).unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn syntax_errors_are_caught_at_parse_time() {
        assert!("0".parse::<PageSelection>().unwrap_err().contains("invalid"));
        assert!("a-2".parse::<PageSelection>().unwrap_err().contains("invalid page number"));
        assert!("5-2".parse::<PageSelection>().unwrap_err().contains("descending"));
        assert!(" , ".parse::<PageSelection>().is_err());
    }

    #[test]
    fn bounds_checked_against_document() {
        let err = indices("2,6", 5).unwrap_err();
        assert!(err.contains("page 6 exceeds"), "{err}");
    }

    #[test]
    fn display_round_trips() {
        let sel: PageSelection = "1,3-5".parse().unwrap();
        assert_eq!(sel.to_string(), "1,3-5");
    }
}
