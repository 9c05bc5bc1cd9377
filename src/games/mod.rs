pub mod simon;

pub struct GameDescriptor
{
    pub name: &'static str,
    pub description: &'static str,
}

pub fn registry() -> Vec<GameDescriptor>
{
    vec![GameDescriptor {
        name: "simon",
        description: "Repeat the growing light sequence on the number keys",
    }]
}

pub fn find(name: &str) -> Option<GameDescriptor>
{
    registry()
        .into_iter()
        .find(|game| game.name.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn lookup_ignores_case()
    {
        assert_eq!(find("SIMON").map(|game| game.name), Some("simon"));
        assert!(find("tetris").is_none());
    }
}
