//! The problem catalog: problem statements, starter templates and the test
//! cases the judge runs against.

use anyhow::Context;
use serde::{
    de::{self, IntoDeserializer},
    Deserialize, Deserializer, Serialize,
};
use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    path::Path,
};

use crate::{err::JudgerErr, tester::model::TestCase, util::single_or_array};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "js", alias = "JS")]
    Javascript,
}

impl Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::Javascript => f.write_str("JS"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// A problem as shown to the user. Immutable once loaded.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Problem {
    pub id: String,
    pub title: String,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "single_or_array::<_, Language, _>")]
    pub languages: Vec<Language>,
    /// Starter source per language.
    #[serde(default, deserialize_with = "language_keys")]
    pub templates: HashMap<Language, String>,
    /// Ordered; the first case is the one "Run" uses.
    pub test_cases: Vec<TestCase>,
}

impl Problem {
    pub fn template(&self, language: Language) -> Result<&str, JudgerErr> {
        self.templates
            .get(&language)
            .map(String::as_str)
            .ok_or_else(|| JudgerErr::NoTemplate(self.id.clone(), language))
    }
}

/// Map keys are plain strings in TOML; route them through the enum's own
/// deserializer so aliases like `js` work there too.
fn language_keys<'de, D>(deserializer: D) -> Result<HashMap<Language, String>, D::Error>
where
    D: Deserializer<'de>,
{
    HashMap::<String, String>::deserialize(deserializer)?
        .into_iter()
        .map(|(key, template)| {
            let key: de::value::StringDeserializer<D::Error> = key.into_deserializer();
            let language = Language::deserialize(key)?;
            Ok((language, template))
        })
        .collect()
}

/// Problem files shipped inside the binary.
const BUILTIN_PROBLEMS: &str = include_str!("../problems/builtin.toml");

/// A file holding several problems, as `[[problems]]` tables.
#[derive(Deserialize)]
struct ProblemSet {
    problems: Vec<Problem>,
}

/// All known problems, by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    problems: BTreeMap<String, Problem>,
}

impl Catalog {
    /// The problems that ship with the judge.
    pub fn builtin() -> Result<Catalog, JudgerErr> {
        let set: ProblemSet = toml::from_str(BUILTIN_PROBLEMS)?;
        let mut catalog = Catalog::default();
        set.problems.into_iter().for_each(|p| catalog.insert(p));
        Ok(catalog)
    }

    /// The builtin problems plus every `*.toml` and `*.json` problem file in
    /// `dir`. A file may redefine a builtin id.
    pub async fn load_dir(dir: &Path) -> Result<Catalog, JudgerErr> {
        let mut catalog = Catalog::builtin()?;
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut paths = vec![];
        while let Some(entry) = entries.next_entry().await? {
            paths.push(entry.path());
        }
        // directory order is unspecified
        paths.sort();

        for path in paths {
            let problem = match path.extension().and_then(|x| x.to_str()) {
                Some(ext @ ("toml" | "json")) => load_problem(&path, ext).await?,
                _ => continue,
            };
            tracing::debug!(path = %path.display(), "Loaded problem file");
            catalog.insert(problem);
        }
        Ok(catalog)
    }

    pub fn insert(&mut self, problem: Problem) {
        if self.problems.contains_key(&problem.id) {
            tracing::info!(id = %problem.id, "Problem redefined");
        }
        self.problems.insert(problem.id.clone(), problem);
    }

    pub fn get(&self, id: &str) -> Result<&Problem, JudgerErr> {
        self.problems
            .get(id)
            .ok_or_else(|| JudgerErr::NoSuchProblem(id.to_owned()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Problem> {
        self.problems.values()
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }
}

async fn load_problem(path: &Path, ext: &str) -> anyhow::Result<Problem> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read problem file {}", path.display()))?;
    let problem = if ext == "toml" {
        toml::from_str(&raw).with_context(|| format!("Bad problem file {}", path.display()))?
    } else {
        serde_json::from_str(&raw).with_context(|| format!("Bad problem file {}", path.display()))?
    };
    Ok(problem)
}
