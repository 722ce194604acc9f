#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct League {
    pub name: &'static str,
    pub code: &'static str,
}

pub const BASE_LEAGUES: [League; 6] = [
    League {
        name: "Germany - Bundesliga",
        code: "BL1",
    },
    League {
        name: "England - Premier League",
        code: "PL",
    },
    League {
        name: "France - Ligue 1",
        code: "FL1",
    },
    League {
        name: "Netherlands - Eredivisie",
        code: "DED",
    },
    League {
        name: "Brazil - Serie A",
        code: "BSA",
    },
    League {
        name: "Spain - La Liga",
        code: "PD",
    },
];

pub const CHAMPIONS_LEAGUE: League = League {
    name: "Champions League",
    code: "CL",
};

impl League {
    /// Group-stage competitions publish one table per group; these get merged
    /// and re-ranked into a single table.
    pub fn merges_groups(&self) -> bool {
        self.code == CHAMPIONS_LEAGUE.code
    }

    fn matches_filter(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        needle.is_empty()
            || self.code.eq_ignore_ascii_case(&needle)
            || self.name.to_lowercase().contains(&needle)
    }
}

/// Catalog order, optionally with the Champions League, narrowed by `only`
/// (exact code or a piece of the name, case-insensitive).
pub fn select_leagues(include_cl: bool, only: Option<&str>) -> Vec<League> {
    BASE_LEAGUES
        .iter()
        .copied()
        .chain(include_cl.then_some(CHAMPIONS_LEAGUE))
        .filter(|l| only.is_none_or(|needle| l.matches_filter(needle)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_base_leagues_by_default() {
        let codes: Vec<&str> = select_leagues(false, None).iter().map(|l| l.code).collect();
        assert_eq!(codes, vec!["BL1", "PL", "FL1", "DED", "BSA", "PD"]);
        assert_eq!(select_leagues(true, None).len(), 7);
    }

    #[test]
    fn only_matches_code_or_name_fragment() {
        let by_code = select_leagues(false, Some("pl"));
        assert_eq!(by_code, vec![BASE_LEAGUES[1]]);

        let by_name = select_leagues(false, Some("La Liga"));
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].code, "PD");

        assert!(select_leagues(false, Some("CL")).is_empty());
        assert_eq!(select_leagues(true, Some("champions"))[0].code, "CL");
    }
}
