use serde::Serialize;
use tracing::{error, info};

use crate::models::{Movie, MovieId, Showtime};
use crate::services::{ApiError, BackendClient};

pub const MOVIES_PER_PAGE: usize = 4;

/// Какой список фильмов показывать.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MovieSection {
    All,
    NowShowing,
    Upcoming,
    TopRated { min_rating: Option<f64> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoviePage {
    pub movies: Vec<Movie>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

// Фильтр по строке поиска; пустая строка пропускает все фильмы
pub fn search(movies: &[Movie], query: &str) -> Vec<Movie> {
    let query = query.trim();
    movies
        .iter()
        .filter(|m| query.is_empty() || m.matches(query))
        .cloned()
        .collect()
}

/// Страница результатов. Номер страницы прижимается к `[1, total_pages]`.
pub fn paginate(movies: Vec<Movie>, page: usize, per_page: usize) -> MoviePage {
    let per_page = per_page.max(1);
    let total_matches = movies.len();
    let total_pages = total_matches.div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);

    let movies = movies
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    MoviePage { movies, page, total_pages, total_matches }
}

pub struct CatalogController {
    backend: BackendClient,
}

impl CatalogController {
    pub fn new(backend: BackendClient) -> Self {
        Self { backend }
    }

    pub async fn section(&self, section: MovieSection) -> Result<Vec<Movie>, ApiError> {
        let result = match section {
            MovieSection::All => self.backend.movies().await,
            MovieSection::NowShowing => self.backend.currently_showing().await,
            MovieSection::Upcoming => self.backend.upcoming().await,
            MovieSection::TopRated { min_rating } => self.backend.top_rated(min_rating).await,
        };
        if let Err(e) = &result {
            error!("Error fetching movies ({:?}): {}", section, e);
        }
        result
    }

    /// Список фильмов раздела с поиском и постраничным выводом.
    pub async fn browse(
        &self,
        section: MovieSection,
        query: &str,
        page: usize,
    ) -> Result<MoviePage, ApiError> {
        let movies = self.section(section).await?;
        let page = paginate(search(&movies, query), page, MOVIES_PER_PAGE);
        info!(
            "Movies {:?}: {} matches for '{}', page {}/{}",
            section, page.total_matches, query, page.page, page.total_pages
        );
        Ok(page)
    }

    pub async fn movie(&self, movie_id: MovieId) -> Result<Movie, ApiError> {
        self.backend.movie(movie_id).await
    }

    /// Сеансы фильма в хронологическом порядке.
    pub async fn showtimes(&self, movie_id: MovieId) -> Result<Vec<Showtime>, ApiError> {
        let mut showtimes = self.backend.showtimes(movie_id).await?;
        showtimes.sort_by_key(|s| s.start_time);
        Ok(showtimes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: MovieId, title: &str, description: Option<&str>) -> Movie {
        Movie {
            id,
            title: title.to_string(),
            description: description.map(str::to_string),
            duration: None,
            language: None,
            rating: None,
            poster_url: None,
            release_date: None,
        }
    }

    #[test]
    fn search_matches_title_or_description_case_insensitive() {
        let movies = vec![
            movie(1, "Interstellar", Some("Space travel")),
            movie(2, "Dune", Some("Desert planet and SPICE")),
            movie(3, "Heat", None),
        ];

        let ids = |found: Vec<Movie>| found.into_iter().map(|m| m.id).collect::<Vec<_>>();
        assert_eq!(ids(search(&movies, "stellar")), vec![1]);
        assert_eq!(ids(search(&movies, "spice")), vec![2]);
        assert_eq!(ids(search(&movies, "  ")), vec![1, 2, 3]);
        assert!(search(&movies, "nothing").is_empty());
    }

    #[test]
    fn paginate_clamps_page() {
        let movies: Vec<Movie> = (1..=9).map(|i| movie(i, "m", None)).collect();

        let last = paginate(movies.clone(), 10, 4);
        assert_eq!(last.page, 3);
        assert_eq!(last.total_pages, 3);
        assert_eq!(last.movies.len(), 1);

        let first = paginate(movies, 0, 4);
        assert_eq!(first.page, 1);
        assert_eq!(first.movies.len(), 4);
    }

    #[test]
    fn empty_result_still_has_one_page() {
        let page = paginate(Vec::new(), 3, MOVIES_PER_PAGE);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page, 1);
        assert!(page.movies.is_empty());
    }
}
