//! Match document shape and the pure transformations applied to it.
//!
//! Every mutation is expressed as a [`MatchPatch`]: a list of field writes computed from
//! a snapshot of the current document. Stores persist the patch as a single partial
//! update and callers derive their local view with [`MatchPatch::apply_to`].

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use utoipa::ToSchema;

/// Label of one of the three scoring segments of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum SetLabel {
    /// First set.
    #[serde(rename = "st")]
    First,
    /// Second set.
    #[serde(rename = "nd")]
    Second,
    /// Third set.
    #[serde(rename = "rd")]
    Third,
}

impl SetLabel {
    /// Every set in board order.
    pub const ALL: [SetLabel; 3] = [SetLabel::First, SetLabel::Second, SetLabel::Third];

    /// Key used for this set inside the stored document.
    pub fn as_str(self) -> &'static str {
        match self {
            SetLabel::First => "st",
            SetLabel::Second => "nd",
            SetLabel::Third => "rd",
        }
    }

    /// Ordinal caption shown on board tabs.
    pub fn caption(self) -> &'static str {
        match self {
            SetLabel::First => "1st",
            SetLabel::Second => "2nd",
            SetLabel::Third => "3rd",
        }
    }
}

/// Label of one of the two sides of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum TeamLabel {
    /// Left-hand side.
    #[serde(rename = "a")]
    A,
    /// Right-hand side.
    #[serde(rename = "b")]
    B,
}

impl TeamLabel {
    /// Both teams in board order.
    pub const ALL: [TeamLabel; 2] = [TeamLabel::A, TeamLabel::B];

    /// Key used for this team inside the stored document.
    pub fn as_str(self) -> &'static str {
        match self {
            TeamLabel::A => "a",
            TeamLabel::B => "b",
        }
    }
}

/// Position of a player inside a team's ordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum PlayerSlot {
    /// First player of the pair.
    #[serde(rename = "0")]
    First,
    /// Second player of the pair.
    #[serde(rename = "1")]
    Second,
}

impl PlayerSlot {
    /// Both slots in pair order.
    pub const ALL: [PlayerSlot; 2] = [PlayerSlot::First, PlayerSlot::Second];

    /// Array index of the slot.
    pub fn index(self) -> usize {
        match self {
            PlayerSlot::First => 0,
            PlayerSlot::Second => 1,
        }
    }
}

/// Per-team values, serialized as `{"a": .., "b": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMap<T> {
    /// Value for team `a`.
    pub a: T,
    /// Value for team `b`.
    pub b: T,
}

impl<T> TeamMap<T> {
    /// Build a map from one value per team.
    pub fn new(a: T, b: T) -> Self {
        Self { a, b }
    }

    /// Iterate over `(label, value)` pairs in board order.
    pub fn iter(&self) -> impl Iterator<Item = (TeamLabel, &T)> {
        [(TeamLabel::A, &self.a), (TeamLabel::B, &self.b)].into_iter()
    }
}

impl<T> Index<TeamLabel> for TeamMap<T> {
    type Output = T;

    fn index(&self, team: TeamLabel) -> &T {
        match team {
            TeamLabel::A => &self.a,
            TeamLabel::B => &self.b,
        }
    }
}

impl<T> IndexMut<TeamLabel> for TeamMap<T> {
    fn index_mut(&mut self, team: TeamLabel) -> &mut T {
        match team {
            TeamLabel::A => &mut self.a,
            TeamLabel::B => &mut self.b,
        }
    }
}

/// Per-set values, serialized as `{"st": .., "nd": .., "rd": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetMap<T> {
    /// First set.
    pub st: T,
    /// Second set.
    pub nd: T,
    /// Third set.
    pub rd: T,
}

impl<T> SetMap<T> {
    /// Iterate over `(label, value)` pairs in board order.
    pub fn iter(&self) -> impl Iterator<Item = (SetLabel, &T)> {
        [
            (SetLabel::First, &self.st),
            (SetLabel::Second, &self.nd),
            (SetLabel::Third, &self.rd),
        ]
        .into_iter()
    }
}

impl<T> Index<SetLabel> for SetMap<T> {
    type Output = T;

    fn index(&self, set: SetLabel) -> &T {
        match set {
            SetLabel::First => &self.st,
            SetLabel::Second => &self.nd,
            SetLabel::Third => &self.rd,
        }
    }
}

impl<T> IndexMut<SetLabel> for SetMap<T> {
    fn index_mut(&mut self, set: SetLabel) -> &mut T {
        match set {
            SetLabel::First => &mut self.st,
            SetLabel::Second => &mut self.nd,
            SetLabel::Third => &mut self.rd,
        }
    }
}

/// A single player of a team.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Player {
    /// Display name.
    pub name: String,
    /// Whether this player currently serves.
    pub serve: bool,
}

impl Player {
    /// Player that is not serving.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            serve: false,
        }
    }
}

/// Ordered pair of players fielded by one team.
pub type PlayerPair = [Player; 2];

/// Both teams' player pairs for one set.
pub type SetPlayers = TeamMap<PlayerPair>;

/// State of one set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetState {
    /// Team display names.
    pub name: TeamMap<String>,
    /// Team scores. Unbounded in both directions.
    pub score: TeamMap<i64>,
    /// Team players.
    pub player: SetPlayers,
}

/// Root match document, one per match identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// The three sets of the match.
    pub set: SetMap<SetState>,
}

/// Names used to seed a freshly created match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchDefaults {
    /// Team display names.
    pub team_names: TeamMap<String>,
    /// Player display names per team.
    pub player_names: TeamMap<[String; 2]>,
}

impl Default for MatchDefaults {
    fn default() -> Self {
        Self {
            team_names: TeamMap::new("Team A".into(), "Team B".into()),
            player_names: TeamMap::new(
                ["Player A1".into(), "Player A2".into()],
                ["Player B1".into(), "Player B2".into()],
            ),
        }
    }
}

impl Match {
    /// Build a new match where every set starts from the same defaults.
    pub fn new(defaults: &MatchDefaults) -> Self {
        let set = || SetState {
            name: defaults.team_names.clone(),
            score: TeamMap::new(0, 0),
            player: TeamMap::new(
                defaults.player_names.a.clone().map(Player::named),
                defaults.player_names.b.clone().map(Player::named),
            ),
        };

        Self {
            set: SetMap {
                st: set(),
                nd: set(),
                rd: set(),
            },
        }
    }

    /// Locate the serving player, if any.
    pub fn server(&self) -> Option<(SetLabel, TeamLabel, PlayerSlot)> {
        self.servers().next()
    }

    /// Number of players with the serve flag raised across the whole match.
    pub fn serve_count(&self) -> usize {
        self.servers().count()
    }

    fn servers(&self) -> impl Iterator<Item = (SetLabel, TeamLabel, PlayerSlot)> + '_ {
        self.set.iter().flat_map(|(set, state)| {
            state.player.iter().flat_map(move |(team, pair)| {
                PlayerSlot::ALL
                    .into_iter()
                    .filter(move |slot| pair[slot.index()].serve)
                    .map(move |slot| (set, team, slot))
            })
        })
    }
}

/// One field assignment inside a match document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldWrite {
    /// `set.<set>.score.<team>`
    Score {
        /// Target set.
        set: SetLabel,
        /// Target team.
        team: TeamLabel,
        /// New score.
        value: i64,
    },
    /// `set.<set>.name.<team>`
    TeamName {
        /// Target set.
        set: SetLabel,
        /// Target team.
        team: TeamLabel,
        /// New display name.
        name: String,
    },
    /// `set.<set>.player.<team>.<slot>.name`
    PlayerName {
        /// Target set.
        set: SetLabel,
        /// Target team.
        team: TeamLabel,
        /// Target slot in the pair.
        slot: PlayerSlot,
        /// New display name.
        name: String,
    },
    /// `set.<set>.player`
    Players {
        /// Target set.
        set: SetLabel,
        /// Replacement player object for both teams.
        players: SetPlayers,
    },
}

impl FieldWrite {
    /// Dotted path of the written field, relative to the document root.
    pub fn path(&self) -> String {
        match self {
            FieldWrite::Score { set, team, .. } => {
                format!("set.{}.score.{}", set.as_str(), team.as_str())
            }
            FieldWrite::TeamName { set, team, .. } => {
                format!("set.{}.name.{}", set.as_str(), team.as_str())
            }
            FieldWrite::PlayerName {
                set, team, slot, ..
            } => format!(
                "set.{}.player.{}.{}.name",
                set.as_str(),
                team.as_str(),
                slot.index()
            ),
            FieldWrite::Players { set, .. } => format!("set.{}.player", set.as_str()),
        }
    }

    /// JSON value stored at [`FieldWrite::path`].
    pub fn value(&self) -> Value {
        match self {
            FieldWrite::Score { value, .. } => json!(value),
            FieldWrite::TeamName { name, .. } | FieldWrite::PlayerName { name, .. } => {
                json!(name)
            }
            FieldWrite::Players { players, .. } => json!(players),
        }
    }

    /// Apply the write to a document in place.
    pub fn apply(&self, document: &mut Match) {
        match self {
            FieldWrite::Score { set, team, value } => {
                document.set[*set].score[*team] = *value;
            }
            FieldWrite::TeamName { set, team, name } => {
                document.set[*set].name[*team] = name.clone();
            }
            FieldWrite::PlayerName {
                set,
                team,
                slot,
                name,
            } => {
                document.set[*set].player[*team][slot.index()].name = name.clone();
            }
            FieldWrite::Players { set, players } => {
                document.set[*set].player = players.clone();
            }
        }
    }
}

/// Field writes persisted together as one partial update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPatch {
    writes: Vec<FieldWrite>,
}

impl MatchPatch {
    /// Patch made of a single write.
    pub fn single(write: FieldWrite) -> Self {
        Self {
            writes: vec![write],
        }
    }

    /// Writes in application order.
    pub fn writes(&self) -> &[FieldWrite] {
        &self.writes
    }

    /// Apply every write to `document` in place.
    pub fn apply(&self, document: &mut Match) {
        for write in &self.writes {
            write.apply(document);
        }
    }

    /// Derive the next document without touching `current`.
    pub fn apply_to(&self, current: &Match) -> Match {
        let mut next = current.clone();
        self.apply(&mut next);
        next
    }
}

/// Rejections raised before any write is issued.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    /// A display name was empty once trimmed.
    #[error("{field} must not be empty")]
    EmptyName {
        /// Name of the offending input.
        field: &'static str,
    },
    /// More than one serve flag was raised in a replacement player object.
    #[error("at most one player may serve, got {count}")]
    MultipleServers {
        /// Number of raised flags.
        count: usize,
    },
}

fn require_name(field: &'static str, raw: &str) -> Result<String, ModelError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ModelError::EmptyName { field });
    }
    Ok(trimmed.to_owned())
}

/// Add `delta` to a team's score. No clamping; saturates at the integer bounds.
pub fn score_update(current: &Match, set: SetLabel, team: TeamLabel, delta: i64) -> MatchPatch {
    let value = current.set[set].score[team].saturating_add(delta);
    MatchPatch::single(FieldWrite::Score { set, team, value })
}

/// Rename a team within one set.
pub fn name_update(set: SetLabel, team: TeamLabel, name: &str) -> Result<MatchPatch, ModelError> {
    let name = require_name("name", name)?;
    Ok(MatchPatch::single(FieldWrite::TeamName { set, team, name }))
}

/// Rename both players of a team's pair, keeping their serve flags.
pub fn player_names_update(
    set: SetLabel,
    team: TeamLabel,
    name1: &str,
    name2: &str,
) -> Result<MatchPatch, ModelError> {
    let first = require_name("name1", name1)?;
    let second = require_name("name2", name2)?;
    Ok(MatchPatch {
        writes: vec![
            FieldWrite::PlayerName {
                set,
                team,
                slot: PlayerSlot::First,
                name: first,
            },
            FieldWrite::PlayerName {
                set,
                team,
                slot: PlayerSlot::Second,
                name: second,
            },
        ],
    })
}

/// Replace the whole player object of a set.
///
/// Names are trimmed and must not be blank. At most one serve flag may be raised; when one
/// is, flags still raised in other sets are cleared in the same patch.
pub fn players_update(
    current: &Match,
    set: SetLabel,
    mut players: SetPlayers,
) -> Result<MatchPatch, ModelError> {
    for team in TeamLabel::ALL {
        for player in players[team].iter_mut() {
            player.name = require_name("player name", &player.name)?;
        }
    }

    let count = players
        .iter()
        .map(|(_, pair)| pair.iter().filter(|p| p.serve).count())
        .sum::<usize>();
    if count > 1 {
        return Err(ModelError::MultipleServers { count });
    }

    let mut writes = vec![FieldWrite::Players { set, players }];
    if count == 1 {
        clear_other_servers(current, set, &mut writes);
    }
    Ok(MatchPatch { writes })
}

/// Flip one player's serve flag.
///
/// Raising a flag lowers the three other flags of the set. Sets other than `set` that
/// still carry a raised flag are cleared in the same patch so the whole match never has
/// more than one server.
pub fn serve_toggle(
    current: &Match,
    set: SetLabel,
    team: TeamLabel,
    slot: PlayerSlot,
) -> MatchPatch {
    let raise = !current.set[set].player[team][slot.index()].serve;

    let mut players = current.set[set].player.clone();
    for other_team in TeamLabel::ALL {
        for other_slot in PlayerSlot::ALL {
            players[other_team][other_slot.index()].serve = false;
        }
    }
    players[team][slot.index()].serve = raise;

    let mut writes = vec![FieldWrite::Players { set, players }];
    if raise {
        clear_other_servers(current, set, &mut writes);
    }

    MatchPatch { writes }
}

fn clear_other_servers(current: &Match, set: SetLabel, writes: &mut Vec<FieldWrite>) {
    for (other_set, state) in current.set.iter() {
        if other_set == set {
            continue;
        }
        if state.player.iter().any(|(_, pair)| pair.iter().any(|p| p.serve)) {
            writes.push(FieldWrite::Players {
                set: other_set,
                players: cleared(&state.player),
            });
        }
    }
}

/// Reverse the order of a team's player pair.
pub fn swap_update(current: &Match, set: SetLabel, team: TeamLabel) -> MatchPatch {
    let mut players = current.set[set].player.clone();
    players[team].swap(0, 1);
    MatchPatch::single(FieldWrite::Players { set, players })
}

fn cleared(players: &SetPlayers) -> SetPlayers {
    let mut players = players.clone();
    for team in TeamLabel::ALL {
        for player in players[team].iter_mut() {
            player.serve = false;
        }
    }
    players
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fresh() -> Match {
        Match::new(&MatchDefaults::default())
    }

    fn set_strategy() -> impl Strategy<Value = SetLabel> {
        prop_oneof![
            Just(SetLabel::First),
            Just(SetLabel::Second),
            Just(SetLabel::Third)
        ]
    }

    fn team_strategy() -> impl Strategy<Value = TeamLabel> {
        prop_oneof![Just(TeamLabel::A), Just(TeamLabel::B)]
    }

    fn slot_strategy() -> impl Strategy<Value = PlayerSlot> {
        prop_oneof![Just(PlayerSlot::First), Just(PlayerSlot::Second)]
    }

    #[test]
    fn new_match_uses_defaults_everywhere() {
        let m = fresh();
        for (_, state) in m.set.iter() {
            assert_eq!(state.name.a, "Team A");
            assert_eq!(state.score, TeamMap::new(0, 0));
            assert_eq!(state.player.b[1].name, "Player B2");
        }
        assert_eq!(m.server(), None);
    }

    #[test]
    fn document_serializes_with_short_keys() {
        let value = serde_json::to_value(fresh()).unwrap();
        assert_eq!(value["set"]["nd"]["score"]["b"], json!(0));
        assert_eq!(value["set"]["rd"]["player"]["a"][1]["name"], json!("Player A2"));
        assert_eq!(value["set"]["st"]["player"]["b"][0]["serve"], json!(false));
    }

    #[test]
    fn score_goes_negative_without_clamping() {
        let m = fresh();
        let patch = score_update(&m, SetLabel::First, TeamLabel::A, -1);
        assert_eq!(patch.apply_to(&m).set.st.score.a, -1);
        assert_eq!(patch.writes()[0].path(), "set.st.score.a");
    }

    #[test]
    fn score_sequence_from_example() {
        let mut m = fresh();
        for delta in [1, 1, -1] {
            score_update(&m, SetLabel::Second, TeamLabel::B, delta).apply(&mut m);
        }
        assert_eq!(m.set.nd.score.b, 1);
        assert_eq!(m.set.nd.score.a, 0);
    }

    #[test]
    fn name_update_trims_and_rejects_blank() {
        let patch = name_update(SetLabel::Third, TeamLabel::B, "  Smashers ").unwrap();
        assert_eq!(patch.apply_to(&fresh()).set.rd.name.b, "Smashers");
        assert_eq!(patch.writes()[0].path(), "set.rd.name.b");

        assert_eq!(
            name_update(SetLabel::Third, TeamLabel::B, "   "),
            Err(ModelError::EmptyName { field: "name" })
        );
    }

    #[test]
    fn player_names_keep_serve_flags() {
        let mut m = fresh();
        serve_toggle(&m, SetLabel::First, TeamLabel::A, PlayerSlot::Second).apply(&mut m);

        let patch = player_names_update(SetLabel::First, TeamLabel::A, "Lin", "Axelsen").unwrap();
        let next = patch.apply_to(&m);
        assert_eq!(next.set.st.player.a[0], Player::named("Lin"));
        assert_eq!(
            next.set.st.player.a[1],
            Player {
                name: "Axelsen".into(),
                serve: true
            }
        );
        assert_eq!(patch.writes()[1].path(), "set.st.player.a.1.name");
    }

    #[test]
    fn player_names_require_both() {
        assert_eq!(
            player_names_update(SetLabel::First, TeamLabel::A, "Lin", " "),
            Err(ModelError::EmptyName { field: "name2" })
        );
        assert_eq!(
            player_names_update(SetLabel::First, TeamLabel::A, "", "Lee"),
            Err(ModelError::EmptyName { field: "name1" })
        );
    }

    #[test]
    fn toggling_the_server_off_leaves_nobody_serving() {
        let mut m = fresh();
        serve_toggle(&m, SetLabel::First, TeamLabel::B, PlayerSlot::First).apply(&mut m);
        assert_eq!(
            m.server(),
            Some((SetLabel::First, TeamLabel::B, PlayerSlot::First))
        );

        serve_toggle(&m, SetLabel::First, TeamLabel::B, PlayerSlot::First).apply(&mut m);
        assert_eq!(m.serve_count(), 0);
    }

    #[test]
    fn raising_a_flag_in_another_set_clears_the_previous_server() {
        let mut m = fresh();
        serve_toggle(&m, SetLabel::First, TeamLabel::A, PlayerSlot::First).apply(&mut m);
        let patch = serve_toggle(&m, SetLabel::Second, TeamLabel::B, PlayerSlot::Second);
        assert_eq!(patch.writes().len(), 2);
        patch.apply(&mut m);
        assert_eq!(
            m.server(),
            Some((SetLabel::Second, TeamLabel::B, PlayerSlot::Second))
        );
        assert_eq!(m.serve_count(), 1);
    }

    #[test]
    fn players_write_serializes_whole_object() {
        let m = fresh();
        let patch = players_update(&m, SetLabel::Second, m.set.nd.player.clone()).unwrap();
        let write = &patch.writes()[0];
        assert_eq!(write.path(), "set.nd.player");
        assert_eq!(write.value()["b"][0]["name"], json!("Player B1"));
    }

    #[test]
    fn replacing_players_rejects_two_servers() {
        let m = fresh();
        let mut players = m.set.st.player.clone();
        players.a[0].serve = true;
        players.b[1].serve = true;

        assert_eq!(
            players_update(&m, SetLabel::First, players),
            Err(ModelError::MultipleServers { count: 2 })
        );
    }

    #[test]
    fn replacing_players_rejects_blank_names() {
        let m = fresh();
        let mut players = m.set.st.player.clone();
        players.b[1].name = "  ".into();

        assert_eq!(
            players_update(&m, SetLabel::First, players),
            Err(ModelError::EmptyName {
                field: "player name"
            })
        );
    }

    #[test]
    fn replacing_players_with_a_server_clears_other_sets() {
        let m = serve_toggle(&fresh(), SetLabel::First, TeamLabel::A, PlayerSlot::First)
            .apply_to(&fresh());
        let mut players = m.set.nd.player.clone();
        players.b[0].serve = true;
        players.a[1].name = " Lin ".into();

        let next = players_update(&m, SetLabel::Second, players)
            .unwrap()
            .apply_to(&m);
        assert_eq!(next.serve_count(), 1);
        assert_eq!(
            next.server(),
            Some((SetLabel::Second, TeamLabel::B, PlayerSlot::First))
        );
        assert_eq!(next.set.nd.player.a[1].name, "Lin");
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn score_equals_initial_plus_deltas(
            initial in -50i64..50,
            deltas in proptest::collection::vec(prop_oneof![Just(1i64), Just(-1i64)], 0..40),
            set in set_strategy(),
            team in team_strategy(),
        ) {
            let mut m = fresh();
            m.set[set].score[team] = initial;
            for delta in &deltas {
                score_update(&m, set, team, *delta).apply(&mut m);
            }
            prop_assert_eq!(m.set[set].score[team], initial + deltas.iter().sum::<i64>());
        }

        #[test]
        fn at_most_one_server_after_any_toggles(
            toggles in proptest::collection::vec(
                (set_strategy(), team_strategy(), slot_strategy()),
                1..30,
            ),
        ) {
            let mut m = fresh();
            for (set, team, slot) in toggles {
                serve_toggle(&m, set, team, slot).apply(&mut m);
                let in_set = m.set[set]
                    .player
                    .iter()
                    .flat_map(|(_, pair)| pair.iter())
                    .filter(|p| p.serve)
                    .count();
                prop_assert!(in_set <= 1);
                prop_assert!(m.serve_count() <= 1);
            }
        }

        #[test]
        fn swap_is_its_own_inverse(
            set in set_strategy(),
            team in team_strategy(),
            serve_slot in slot_strategy(),
        ) {
            let mut m = fresh();
            serve_toggle(&m, set, team, serve_slot).apply(&mut m);
            let once = swap_update(&m, set, team).apply_to(&m);
            prop_assert_ne!(&once.set[set].player[team], &m.set[set].player[team]);
            let twice = swap_update(&once, set, team).apply_to(&once);
            prop_assert_eq!(twice, m);
        }
    }
}
